//! Params - path parameter recovery from matched route templates
//!
//! The request snapshot carries named path parameters. Axum exposes the
//! matched route template (`/users/:id`) to layered middleware; pairing its
//! segments with the concrete request path recovers the values without
//! reaching into router internals.

use std::collections::BTreeMap;

/// Recover named parameters by pairing a route template with a request path.
///
/// `:name` segments bind one path segment; a trailing `*name` segment binds
/// the remainder of the path. Literal segments are skipped.
#[must_use]
pub fn extract_path_params(template: &str, path: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());

    for segment in template.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = segment.strip_prefix(':') {
            if let Some(value) = path_segments.next() {
                params.insert(name.to_string(), value.to_string());
            }
        } else if let Some(name) = segment.strip_prefix('*') {
            let rest: Vec<&str> = path_segments.collect();
            if !rest.is_empty() {
                params.insert(name.to_string(), rest.join("/"));
            }
            break;
        } else {
            path_segments.next();
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_segments() {
        let params = extract_path_params("/users/:id/posts/:post_id", "/users/42/posts/7");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("post_id").map(String::as_str), Some("7"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_wildcard_binds_remainder() {
        let params = extract_path_params("/files/*path", "/files/a/b/c.txt");
        assert_eq!(params.get("path").map(String::as_str), Some("a/b/c.txt"));
    }

    #[test]
    fn test_literal_only_template_yields_nothing() {
        assert!(extract_path_params("/ping", "/ping").is_empty());
    }

    #[test]
    fn test_missing_path_segment_is_skipped() {
        let params = extract_path_params("/users/:id", "/users");
        assert!(params.is_empty());
    }
}
