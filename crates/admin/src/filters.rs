//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use vip_admin_core::resolve::element_type_label;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Label of a user's active flag.
///
/// Usage in templates: `{{ row.active|status_label }}`
#[askama::filter_fn]
pub fn status_label(value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(if value.to_string() == "true" {
        "Active"
    } else {
        "Inactive"
    })
}

/// Display label of an element type id.
///
/// Usage in templates: `{{ id|element_type }}`
#[askama::filter_fn]
pub fn element_type(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(element_type_label(&value.to_string()).to_string())
}
