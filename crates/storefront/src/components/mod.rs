//! Shared view primitives: page chrome, data tables, and admin forms.

pub mod data_table;
pub mod form;
pub mod layout;

pub use data_table::{Pagination, RowView, TableColumn, TableQuery};
pub use form::{FieldKind, FieldView, FormField, FormValues, OptionView};
pub use layout::PageContext;
