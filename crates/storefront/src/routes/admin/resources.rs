//! Column and form definitions of the admin resources.

use chrono::{DateTime, Utc};

use rimline_core::catalog::{
    Deal, DrivingType, FleetNews, Make, Model, Service, Tire, Trim, TyreSize, User, Wheel,
};
use rimline_core::types::{Money, Ref};

use super::crud::AdminResource;
use crate::components::{FieldKind, FormField, TableColumn};

const SEASONS: &[(&str, &str)] = &[
    ("all-season", "All-season"),
    ("all-weather", "All-weather"),
    ("summer", "Summer"),
    ("winter", "Winter"),
];

const ROLES: &[(&str, &str)] = &[("user", "Customer"), ("admin", "Administrator")];

fn date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn optional<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

fn money_or_dash(value: Option<Money>) -> String {
    value.map_or_else(|| "-".to_string(), |m| m.to_string())
}

/// Pricing and service fields shared by tires and wheels.
fn product_pricing_fields() -> [FormField; 7] {
    [
        FormField::new("price", "Price", FieldKind::Money).required(),
        FormField::new("pair_price", "Price for 2", FieldKind::Money),
        FormField::new("set_price", "Price for 4", FieldKind::Money),
        FormField::new("stock", "Stock", FieldKind::Integer).required(),
        FormField::new("installation_fee", "Installation fee (each)", FieldKind::Money),
        FormField::new("addons", "Add-on services", FieldKind::ReferenceList("services")),
        FormField::new("images", "Image URLs", FieldKind::List),
    ]
}

pub struct Makes;

impl AdminResource for Makes {
    type Record = Make;
    const PATH: &'static str = "makes";
    const TITLE: &'static str = "Makes";
    const SINGULAR: &'static str = "Make";

    fn columns() -> Vec<TableColumn> {
        vec![TableColumn::sortable("make", "Make"), TableColumn::new("logo", "Logo")]
    }

    fn cells(make: &Make) -> Vec<String> {
        vec![make.make.clone(), make.logo.clone().unwrap_or_default()]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("make", "Make", FieldKind::Text).required(),
            FormField::new("logo", "Logo URL", FieldKind::Text),
        ]
    }
}

pub struct Models;

impl AdminResource for Models {
    type Record = Model;
    const PATH: &'static str = "models";
    const TITLE: &'static str = "Models";
    const SINGULAR: &'static str = "Model";

    fn columns() -> Vec<TableColumn> {
        vec![TableColumn::sortable("model", "Model"), TableColumn::new("make", "Make")]
    }

    fn cells(model: &Model) -> Vec<String> {
        vec![model.model.clone(), model.make.label()]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("model", "Model", FieldKind::Text).required(),
            FormField::new("make", "Make", FieldKind::Reference("makes")).required(),
        ]
    }
}

pub struct Trims;

impl AdminResource for Trims {
    type Record = Trim;
    const PATH: &'static str = "trims";
    const TITLE: &'static str = "Trims";
    const SINGULAR: &'static str = "Trim";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("trim", "Trim"),
            TableColumn::sortable("year", "Year"),
            TableColumn::new("model", "Model"),
        ]
    }

    fn cells(trim: &Trim) -> Vec<String> {
        vec![trim.trim.clone(), optional(trim.year.as_ref()), trim.model.label()]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("trim", "Trim", FieldKind::Text).required(),
            FormField::new("year", "Year", FieldKind::Integer),
            FormField::new("model", "Model", FieldKind::Reference("models")).required(),
        ]
    }
}

pub struct TyreSizes;

impl AdminResource for TyreSizes {
    type Record = TyreSize;
    const PATH: &'static str = "tyre-sizes";
    const TITLE: &'static str = "Tire sizes";
    const SINGULAR: &'static str = "Tire size";

    fn columns() -> Vec<TableColumn> {
        vec![TableColumn::sortable("size", "Size"), TableColumn::new("trim", "Trim")]
    }

    fn cells(size: &TyreSize) -> Vec<String> {
        vec![size.size.clone(), size.trim.as_ref().map(Ref::label).unwrap_or_default()]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("size", "Size (e.g. 225/45R17)", FieldKind::Text).required(),
            FormField::new("trim", "Trim", FieldKind::Reference("trims")),
        ]
    }
}

pub struct DrivingTypes;

impl AdminResource for DrivingTypes {
    type Record = DrivingType;
    const PATH: &'static str = "driving-types";
    const TITLE: &'static str = "Driving types";
    const SINGULAR: &'static str = "Driving type";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("name", "Name"),
            TableColumn::new("description", "Description"),
        ]
    }

    fn cells(driving_type: &DrivingType) -> Vec<String> {
        vec![
            driving_type.name.clone(),
            driving_type.description.clone().unwrap_or_default(),
        ]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("name", "Name", FieldKind::Text).required(),
            FormField::new("description", "Description", FieldKind::TextArea),
        ]
    }
}

pub struct Services;

impl AdminResource for Services {
    type Record = Service;
    const PATH: &'static str = "services";
    const TITLE: &'static str = "Services";
    const SINGULAR: &'static str = "Service";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("name", "Name"),
            TableColumn::sortable("price", "Price"),
            TableColumn::new("description", "Description"),
        ]
    }

    fn cells(service: &Service) -> Vec<String> {
        vec![
            service.name.clone(),
            service.price.to_string(),
            service.description.clone().unwrap_or_default(),
        ]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("name", "Name", FieldKind::Text).required(),
            FormField::new("price", "Price (each)", FieldKind::Money).required(),
            FormField::new("description", "Description", FieldKind::TextArea),
        ]
    }
}

pub struct Deals;

impl AdminResource for Deals {
    type Record = Deal;
    const PATH: &'static str = "deals";
    const TITLE: &'static str = "Deals";
    const SINGULAR: &'static str = "Deal";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("title", "Title"),
            TableColumn::sortable("brand", "Brand"),
            TableColumn::new("discount_percent", "Discount"),
            TableColumn::sortable("starts_at", "Starts"),
            TableColumn::sortable("ends_at", "Ends"),
        ]
    }

    fn cells(deal: &Deal) -> Vec<String> {
        vec![
            deal.title.clone(),
            deal.brand.clone(),
            format!("{}%", deal.discount_percent.normalize()),
            date(&deal.starts_at),
            date(&deal.ends_at),
        ]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text).required(),
            FormField::new("brand", "Brand", FieldKind::Text).required(),
            FormField::new("discount_percent", "Discount (%)", FieldKind::Decimal).required(),
            FormField::new("starts_at", "Starts (UTC)", FieldKind::DateTime).required(),
            FormField::new("ends_at", "Ends (UTC)", FieldKind::DateTime).required(),
            FormField::new("description", "Description", FieldKind::TextArea),
        ]
    }
}

pub struct FleetNewsResource;

impl AdminResource for FleetNewsResource {
    type Record = FleetNews;
    const PATH: &'static str = "fleet-news";
    const TITLE: &'static str = "Fleet news";
    const SINGULAR: &'static str = "Article";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("title", "Title"),
            TableColumn::sortable("published_at", "Published"),
        ]
    }

    fn cells(news: &FleetNews) -> Vec<String> {
        vec![
            news.title.clone(),
            news.published_at.as_ref().map(date).unwrap_or_else(|| "Draft".to_string()),
        ]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text).required(),
            FormField::new("body", "Body", FieldKind::TextArea).required(),
            FormField::new("image", "Image URL", FieldKind::Text),
            FormField::new("published_at", "Published (UTC)", FieldKind::DateTime),
        ]
    }
}

pub struct Tires;

impl AdminResource for Tires {
    type Record = Tire;
    const PATH: &'static str = "tires";
    const TITLE: &'static str = "Tires";
    const SINGULAR: &'static str = "Tire";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("name", "Name"),
            TableColumn::sortable("brand", "Brand"),
            TableColumn::sortable("size", "Size"),
            TableColumn::sortable("price", "Price"),
            TableColumn::new("set_price", "Set of 4"),
            TableColumn::sortable("stock", "Stock"),
        ]
    }

    fn cells(tire: &Tire) -> Vec<String> {
        vec![
            tire.name.clone(),
            tire.brand.clone(),
            tire.size.clone(),
            tire.price.to_string(),
            money_or_dash(tire.set_price),
            tire.stock.to_string(),
        ]
    }

    fn fields() -> Vec<FormField> {
        let mut fields = vec![
            FormField::new("name", "Name", FieldKind::Text).required(),
            FormField::new("brand", "Brand", FieldKind::Text).required(),
            FormField::new("make", "Make", FieldKind::Reference("makes")),
            FormField::new("size", "Size (e.g. 225/45R17)", FieldKind::Text).required(),
            FormField::new("driving_type", "Driving type", FieldKind::Reference("driving-types")),
            FormField::new("season", "Season", FieldKind::Select(SEASONS)),
            FormField::new("load_index", "Load index", FieldKind::Text),
            FormField::new("speed_rating", "Speed rating", FieldKind::Text),
        ];
        fields.extend(product_pricing_fields());
        fields.push(FormField::new("description", "Description", FieldKind::TextArea));
        fields
    }
}

pub struct Wheels;

impl AdminResource for Wheels {
    type Record = Wheel;
    const PATH: &'static str = "wheels";
    const TITLE: &'static str = "Wheels";
    const SINGULAR: &'static str = "Wheel";

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("name", "Name"),
            TableColumn::sortable("brand", "Brand"),
            TableColumn::sortable("diameter", "Diameter"),
            TableColumn::new("width", "Width"),
            TableColumn::sortable("price", "Price"),
            TableColumn::sortable("stock", "Stock"),
        ]
    }

    fn cells(wheel: &Wheel) -> Vec<String> {
        vec![
            wheel.name.clone(),
            wheel.brand.clone(),
            format!("{}\"", wheel.diameter),
            format!("{}\"", wheel.width.normalize()),
            wheel.price.to_string(),
            wheel.stock.to_string(),
        ]
    }

    fn fields() -> Vec<FormField> {
        let mut fields = vec![
            FormField::new("name", "Name", FieldKind::Text).required(),
            FormField::new("brand", "Brand", FieldKind::Text).required(),
            FormField::new("diameter", "Diameter (in)", FieldKind::Integer).required(),
            FormField::new("width", "Width (in)", FieldKind::Decimal).required(),
            FormField::new("bolt_pattern", "Bolt pattern", FieldKind::Text),
            FormField::new("finish", "Finish", FieldKind::Text),
        ];
        fields.extend(product_pricing_fields());
        fields.push(FormField::new("description", "Description", FieldKind::TextArea));
        fields
    }
}

/// Accounts are created by registering; admins edit roles and contact data.
pub struct Users;

impl AdminResource for Users {
    type Record = User;
    const PATH: &'static str = "users";
    const TITLE: &'static str = "Users";
    const SINGULAR: &'static str = "User";
    const CAN_CREATE: bool = false;

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn::sortable("name", "Name"),
            TableColumn::sortable("email", "Email"),
            TableColumn::sortable("role", "Role"),
            TableColumn::new("phone", "Phone"),
        ]
    }

    fn cells(user: &User) -> Vec<String> {
        vec![
            user.name.clone(),
            user.email.clone(),
            user.role.to_string(),
            user.phone.clone().unwrap_or_default(),
        ]
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("name", "Name", FieldKind::Text).required(),
            FormField::new("email", "Email", FieldKind::Email).required(),
            FormField::new("role", "Role", FieldKind::Select(ROLES)).required(),
            FormField::new("phone", "Phone", FieldKind::Text),
        ]
    }
}
