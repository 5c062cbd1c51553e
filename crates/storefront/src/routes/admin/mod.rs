//! Admin console route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                          - Dashboard
//!
//! # Catalog resources (makes, models, trims, tyre-sizes, driving-types,
//! # services, deals, fleet-news, tires, wheels)
//! GET  /admin/{resource}               - Paginated table (page, q, sort)
//! GET  /admin/{resource}/new           - Create form
//! POST /admin/{resource}               - Create
//! GET  /admin/{resource}/{id}/edit     - Edit form
//! POST /admin/{resource}/{id}          - Update
//! POST /admin/{resource}/{id}/delete   - Delete
//!
//! # Users (no create)
//! GET  /admin/users, edit, update, delete
//!
//! # Orders
//! GET  /admin/orders                   - Order table (page, q, status)
//! GET  /admin/orders/{id}              - Order detail
//! POST /admin/orders/{id}/status       - Change the order status
//! GET  /admin/orders/{id}/invoice.pdf  - Invoice download
//! ```
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin) and
//! forwards the admin's token; the API makes the final authorization call.

pub mod crud;
pub mod dashboard;
pub mod orders;
pub mod resources;

pub use crud::AdminResource;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;
use resources::{
    Deals, DrivingTypes, FleetNewsResource, Makes, Models, Services, Tires, Trims, TyreSizes,
    Users, Wheels,
};

/// Create the admin routes router (nested under `/admin`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/invoice.pdf", get(orders::invoice))
        .merge(crud::routes::<Makes>())
        .merge(crud::routes::<Models>())
        .merge(crud::routes::<Trims>())
        .merge(crud::routes::<TyreSizes>())
        .merge(crud::routes::<DrivingTypes>())
        .merge(crud::routes::<Services>())
        .merge(crud::routes::<Deals>())
        .merge(crud::routes::<FleetNewsResource>())
        .merge(crud::routes::<Tires>())
        .merge(crud::routes::<Wheels>())
        .merge(crud::routes::<Users>())
}
