//! Cache keys for anonymous API reads.
//!
//! Keys are the request path plus its encoded query, relative to the API
//! base URL, so every entry under a resource shares the `/{resource}` prefix.

/// Build the cache key for a GET.
pub fn key(path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    }
}

/// The resource a path belongs to: its first segment, with a leading slash.
pub fn resource_of(path: &str) -> String {
    let first = path
        .trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default();
    format!("/{first}")
}

/// Whether a cached key lies under `resource` (segment-aware).
pub fn in_resource(key: &str, resource: &str) -> bool {
    key.strip_prefix(resource)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key() {
        assert_eq!(key("/tires", None), "/tires");
        assert_eq!(key("/tires", Some("")), "/tires");
        assert_eq!(key("/tires", Some("page=2")), "/tires?page=2");
    }

    #[test]
    fn test_resource_of() {
        assert_eq!(resource_of("/tires/abc"), "/tires");
        assert_eq!(resource_of("tyre-sizes"), "/tyre-sizes");
        assert_eq!(resource_of("/orders/o1/status"), "/orders");
    }

    #[test]
    fn test_in_resource_is_segment_aware() {
        assert!(in_resource("/tires", "/tires"));
        assert!(in_resource("/tires?page=2", "/tires"));
        assert!(in_resource("/tires/t1", "/tires"));
        assert!(!in_resource("/tires-archive", "/tires"));
        assert!(!in_resource("/wheels", "/tires"));
    }
}
