//! OpenSearch query builders.
//!
//! Assembles the request body for a paginated, highlighted search. The
//! query itself is passed through untouched in the engine's native DSL.

use serde_json::{json, Map, Value};

use search_index_shared::SearchRequest;

/// Build a search body from a `SearchRequest`.
///
/// - `from`/`size` come from the request's `skip`/`size`
/// - `_source.includes` is set only when fields were requested
/// - `highlight` is always present with the effective markers; it lists
///   fields only when highlight fields were given
pub fn build_search_body(request: &SearchRequest) -> Value {
    let mut body = json!({
        "query": request.query,
        "from": request.skip,
        "size": request.size,
    });

    let (pre_tag, post_tag) = request.highlight.tags();
    let fields: Map<String, Value> = request
        .highlight
        .fields
        .iter()
        .map(|field| (field.clone(), json!({})))
        .collect();

    body["highlight"] = json!({
        "pre_tags": [pre_tag],
        "post_tags": [post_tag],
        "fields": fields,
    });

    if let Some(includes) = &request.include_fields {
        body["_source"] = json!({ "includes": includes });
    }

    body
}

/// Build a count body. A null query counts every document.
pub fn build_count_body(query: &Value) -> Value {
    if query.is_null() {
        json!({ "query": { "match_all": {} } })
    } else {
        json!({ "query": query })
    }
}
