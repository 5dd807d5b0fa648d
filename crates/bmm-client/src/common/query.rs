//! Path and query helpers for the BMM API

use uuid::Uuid;

/// Collection path for instances of an organization
pub fn instances_path(org: &str) -> String {
    format!("/v2/org/{}/carbide/instance", urlencoding::encode(org))
}

/// Path of a single instance
pub fn instance_path(org: &str, id: Uuid) -> String {
    format!("{}/{}", instances_path(org), id)
}

/// Build query string from filters
pub fn build_query_string(filters: &[(&str, &str)]) -> String {
    filters
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a query string to a path when there are filters
pub fn with_query(path: String, filters: &[(&str, &str)]) -> String {
    if filters.is_empty() {
        path
    } else {
        format!("{}?{}", path, build_query_string(filters))
    }
}
