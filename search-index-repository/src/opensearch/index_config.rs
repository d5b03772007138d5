//! OpenSearch index creation body.
//!
//! Every physical index is created with `max_result_window` raised to the
//! largest value the engine accepts, so deep pagination and exports are not
//! capped at the default 10 000 hits.

use serde_json::{json, Value};

use crate::types::CreateIndexRequest;

/// Largest `max_result_window` the engine accepts.
pub const MAX_RESULT_WINDOW: i32 = i32::MAX;

/// Build the body of a create-index request.
///
/// The body always carries `settings`; `mappings` is only present when the
/// request has an explicit mapping.
pub fn index_settings_body(request: &CreateIndexRequest) -> Value {
    let mut body = json!({
        "settings": {
            "number_of_shards": request.shards,
            "number_of_replicas": request.replicas,
            "max_result_window": MAX_RESULT_WINDOW
        }
    });

    if let Some(mapping) = &request.mapping {
        body["mappings"] = mapping.clone();
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mapping: Option<Value>) -> CreateIndexRequest {
        CreateIndexRequest {
            name: "orders638396640000000000".to_string(),
            shards: 3,
            replicas: 2,
            mapping,
        }
    }

    #[test]
    fn test_settings_structure() {
        let body = index_settings_body(&request(None));

        assert_eq!(body["settings"]["number_of_shards"], 3);
        assert_eq!(body["settings"]["number_of_replicas"], 2);
        assert_eq!(body["settings"]["max_result_window"], 2147483647);
        assert!(body.get("mappings").is_none());
    }

    #[test]
    fn test_mapping_is_applied() {
        let mapping = json!({ "properties": { "total": { "type": "double" } } });
        let body = index_settings_body(&request(Some(mapping.clone())));

        assert_eq!(body["mappings"], mapping);
        assert_eq!(body["settings"]["max_result_window"], MAX_RESULT_WINDOW);
    }
}
