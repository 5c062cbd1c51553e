//! Generic table and form handlers shared by every admin resource.
//!
//! A resource describes its columns and form fields through
//! [`AdminResource`]; [`routes`] mounts the six CRUD routes for it.

use std::collections::{BTreeSet, HashMap};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tower_sessions::Session;
use tracing::instrument;

use rimline_core::types::reference::Document;

use crate::api::{ApiError, Page, doc_path};
use crate::components::form::{FieldErrors, build_payload, field_views};
use crate::components::{
    FieldView, FormField, FormValues, PageContext, Pagination, RowView, TableColumn, TableQuery,
};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::FlashKind;
use crate::routes::flash_redirect;
use crate::state::AppState;

/// Most documents offered by a reference select.
const CHOICE_LIMIT: u32 = 200;

/// Keys tried, in order, for the label of a reference choice.
const LABEL_KEYS: [&str; 6] = ["name", "title", "make", "model", "size", "email"];

/// A REST resource managed from the admin console.
pub trait AdminResource: Send + Sync + 'static {
    /// Record decoded for table rows.
    type Record: DeserializeOwned + Document + Send;

    /// API resource and URL segment, e.g. `tyre-sizes`.
    const PATH: &'static str;
    /// Plural heading, e.g. `Tire sizes`.
    const TITLE: &'static str;
    /// Singular noun for buttons and toasts, e.g. `Tire size`.
    const SINGULAR: &'static str;
    /// Whether new documents can be created here.
    const CAN_CREATE: bool = true;

    /// Table columns.
    fn columns() -> Vec<TableColumn>;

    /// Cells of one row, in column order.
    fn cells(record: &Self::Record) -> Vec<String>;

    /// Form fields for create and edit.
    fn fields() -> Vec<FormField>;
}

/// Mount the CRUD routes of `R` under `/{R::PATH}`.
pub fn routes<R: AdminResource>() -> Router<AppState> {
    let base = format!("/{}", R::PATH);
    let collection = if R::CAN_CREATE {
        get(index::<R>).post(create::<R>)
    } else {
        get(index::<R>)
    };

    let mut router = Router::new()
        .route(&base, collection)
        .route(&format!("{base}/{{id}}/edit"), get(edit::<R>))
        .route(&format!("{base}/{{id}}"), post(update::<R>))
        .route(&format!("{base}/{{id}}/delete"), post(delete::<R>));
    if R::CAN_CREATE {
        router = router.route(&format!("{base}/new"), get(new::<R>));
    }
    router
}

fn base_path<R: AdminResource>() -> String {
    format!("/admin/{}", R::PATH)
}

// =============================================================================
// Table
// =============================================================================

/// Admin table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/table.html")]
pub struct TableTemplate {
    pub ctx: PageContext,
    pub title: &'static str,
    pub singular: &'static str,
    pub base: String,
    pub can_create: bool,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<RowView>,
    pub pagination: Pagination,
    pub q: String,
    pub sort: String,
    pub load_error: Option<String>,
}

impl TableTemplate {
    /// Header link sorting by `key`, flipping the direction when already sorted by it.
    pub fn sort_href(&self, key: &str) -> String {
        let sort = if self.sort == key {
            format!("-{key}")
        } else {
            key.to_string()
        };
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.q.is_empty() {
            query.append_pair("q", &self.q);
        }
        query.append_pair("sort", &sort);
        format!("{}?{}", self.base, query.finish())
    }

    /// Arrow shown next to the sorted column.
    pub fn sort_marker(&self, key: &str) -> &'static str {
        if self.sort == key {
            "▲"
        } else if self.sort.strip_prefix('-') == Some(key) {
            "▼"
        } else {
            ""
        }
    }
}

/// Keep `sort` only when it names a sortable column, optionally negated.
pub fn allowed_sort(columns: &[TableColumn], sort: &str) -> String {
    let key = sort.strip_prefix('-').unwrap_or(sort);
    if columns.iter().any(|c| c.sortable && c.key == key) {
        sort.to_string()
    } else {
        String::new()
    }
}

/// Display the table of a resource.
#[instrument(skip(state, ctx, admin), fields(resource = R::PATH))]
pub async fn index<R: AdminResource>(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(mut query): Query<TableQuery>,
) -> impl IntoResponse {
    let columns = R::columns();
    query.sort = allowed_sort(&columns, &query.sort);
    let base = base_path::<R>();

    let (page, load_error) = match state
        .api()
        .list::<R::Record>(&format!("/{}", R::PATH), &query.api_params(), Some(&admin.token))
        .await
    {
        Ok(page) => (page, None),
        Err(e) => {
            tracing::warn!(error = %e, resource = R::PATH, "Failed to load admin table");
            (Page::empty(), Some(e.user_message()))
        }
    };

    TableTemplate {
        ctx,
        title: R::TITLE,
        singular: R::SINGULAR,
        can_create: R::CAN_CREATE,
        rows: page
            .items
            .iter()
            .map(|record| RowView {
                id: record.document_id().to_string(),
                cells: R::cells(record),
            })
            .collect(),
        pagination: Pagination::new(
            &base,
            &page,
            &[("q", query.q.trim()), ("sort", query.sort.as_str())],
        ),
        base,
        columns,
        q: query.q.trim().to_string(),
        sort: query.sort,
        load_error,
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Admin create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/form.html")]
pub struct FormTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub base: String,
    pub action: String,
    pub submit_label: &'static str,
    pub fields: Vec<FieldView>,
    pub form_error: Option<String>,
    pub delete_action: Option<String>,
}

/// `(id, label)` choices for every resource the fields reference.
async fn reference_choices(
    state: &AppState,
    fields: &[FormField],
) -> HashMap<&'static str, Vec<(String, String)>> {
    let resources: BTreeSet<&'static str> = fields.iter().filter_map(FormField::reference).collect();
    let mut choices = HashMap::new();

    for resource in resources {
        let params = [("limit", CHOICE_LIMIT.to_string())];
        match state.api().list::<Value>(&format!("/{resource}"), &params, None).await {
            Ok(page) => {
                choices.insert(resource, page.items.iter().filter_map(choice).collect());
            }
            Err(e) => {
                tracing::warn!(error = %e, resource, "Failed to load reference choices");
            }
        }
    }
    choices
}

/// The `(id, label)` of a reference choice.
fn choice(document: &Value) -> Option<(String, String)> {
    let id = document.get("_id")?.as_str()?.to_string();
    let text = |key: &str| document.get(key).and_then(Value::as_str);

    let label = match (text("trim"), document.get("year").and_then(Value::as_u64)) {
        (Some(trim), Some(year)) => format!("{year} {trim}"),
        (Some(trim), None) => trim.to_string(),
        _ => LABEL_KEYS
            .iter()
            .find_map(|key| text(key))
            .map_or_else(|| id.clone(), String::from),
    };
    Some((id, label))
}

/// Render a form for `R`.
async fn render_form<R: AdminResource>(
    state: &AppState,
    ctx: PageContext,
    id: Option<&str>,
    values: &FormValues,
    errors: &FieldErrors,
    form_error: Option<String>,
) -> FormTemplate {
    let fields = R::fields();
    let choices = reference_choices(state, &fields).await;
    let base = base_path::<R>();
    let (title, action, submit_label, delete_action) = match id {
        Some(id) => {
            let document = format!("{base}/{}", urlencoding::encode(id));
            (
                format!("Edit {}", R::SINGULAR),
                document.clone(),
                "Save changes",
                Some(format!("{document}/delete")),
            )
        }
        None => (format!("New {}", R::SINGULAR), base.clone(), "Create", None),
    };

    FormTemplate {
        ctx,
        title,
        fields: field_views(&fields, values, errors, &choices),
        base,
        action,
        submit_label,
        form_error,
        delete_action,
    }
}

fn invalid(template: FormTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

/// Display the create form.
#[instrument(skip(state, ctx, _admin), fields(resource = R::PATH))]
pub async fn new<R: AdminResource>(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    render_form::<R>(&state, ctx, None, &FormValues::default(), &FieldErrors::new(), None).await
}

/// Handle the create form.
#[instrument(skip(state, session, ctx, admin, pairs), fields(resource = R::PATH))]
pub async fn create<R: AdminResource>(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let values = FormValues::from_pairs(pairs);
    let payload = match build_payload(&R::fields(), &values, false) {
        Ok(payload) => payload,
        Err(errors) => {
            let form = render_form::<R>(&state, ctx, None, &values, &errors, None).await;
            return Ok(invalid(form));
        }
    };

    match state
        .api()
        .post::<Map<String, Value>, Value>(&format!("/{}", R::PATH), &payload, Some(&admin.token))
        .await
    {
        Ok(_) => {
            add_breadcrumb("admin", "Created document", Some(&[("resource", R::PATH)]));
            let message = format!("{} created.", R::SINGULAR);
            flash_redirect(&session, FlashKind::Success, message, &base_path::<R>()).await
        }
        Err(e) => rejected::<R>(&state, ctx, None, &values, e).await,
    }
}

/// Display the edit form.
#[instrument(skip(state, ctx, admin), fields(resource = R::PATH))]
pub async fn edit<R: AdminResource>(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let document: Value = state
        .api()
        .get(&doc_path(R::PATH, &id), &[], Some(&admin.token))
        .await?;
    let values = FormValues::from_document(&R::fields(), &document);

    Ok(render_form::<R>(&state, ctx, Some(&id), &values, &FieldErrors::new(), None).await)
}

/// Handle the edit form.
#[instrument(skip(state, session, ctx, admin, pairs), fields(resource = R::PATH))]
pub async fn update<R: AdminResource>(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let values = FormValues::from_pairs(pairs);
    let payload = match build_payload(&R::fields(), &values, true) {
        Ok(payload) => payload,
        Err(errors) => {
            let form = render_form::<R>(&state, ctx, Some(&id), &values, &errors, None).await;
            return Ok(invalid(form));
        }
    };

    match state
        .api()
        .put::<Map<String, Value>, Value>(&doc_path(R::PATH, &id), &payload, Some(&admin.token))
        .await
    {
        Ok(_) => {
            let message = format!("{} saved.", R::SINGULAR);
            flash_redirect(&session, FlashKind::Success, message, &base_path::<R>()).await
        }
        Err(e) => rejected::<R>(&state, ctx, Some(&id), &values, e).await,
    }
}

/// Re-render a form the API refused. Expired sessions go back to login.
async fn rejected<R: AdminResource>(
    state: &AppState,
    ctx: PageContext,
    id: Option<&str>,
    values: &FormValues,
    error: ApiError,
) -> Result<Response> {
    if matches!(error, ApiError::Unauthorized) {
        return Err(error.into());
    }
    tracing::warn!(error = %error, resource = R::PATH, "API rejected admin form");
    let form = render_form::<R>(state, ctx, id, values, &FieldErrors::new(), Some(error.user_message()))
        .await;
    Ok(invalid(form))
}

/// Delete a document.
#[instrument(skip(state, session, admin), fields(resource = R::PATH))]
pub async fn delete<R: AdminResource>(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Response> {
    let to = base_path::<R>();
    match state.api().delete(&doc_path(R::PATH, &id), Some(&admin.token)).await {
        Ok(()) => {
            add_breadcrumb(
                "admin",
                "Deleted document",
                Some(&[("resource", R::PATH), ("id", id.as_str())]),
            );
            let message = format!("{} deleted.", R::SINGULAR);
            flash_redirect(&session, FlashKind::Success, message, &to).await
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, resource = R::PATH, id = %id, "Delete failed");
            flash_redirect(&session, FlashKind::Error, e.user_message(), &to).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_allowed_sort() {
        let columns = [TableColumn::sortable("make", "Make"), TableColumn::new("logo", "Logo")];
        assert_eq!(allowed_sort(&columns, "make"), "make");
        assert_eq!(allowed_sort(&columns, "-make"), "-make");
        assert_eq!(allowed_sort(&columns, "logo"), "");
        assert_eq!(allowed_sort(&columns, "password"), "");
    }

    #[test]
    fn test_choice_labels() {
        assert_eq!(
            choice(&json!({"_id": "m1", "make": "Toyota"})),
            Some(("m1".to_string(), "Toyota".to_string()))
        );
        assert_eq!(
            choice(&json!({"_id": "t1", "trim": "SE", "year": 2021, "model": "md1"})),
            Some(("t1".to_string(), "2021 SE".to_string()))
        );
        assert_eq!(
            choice(&json!({"_id": "x9"})),
            Some(("x9".to_string(), "x9".to_string()))
        );
        assert_eq!(choice(&json!({"make": "No id"})), None);
    }
}
