//! Search request and response types.
//!
//! `SearchRequest` carries the pieces of a paginated, highlighted search;
//! turning it into an engine query body is the repository's job.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default opening highlight marker.
pub const DEFAULT_PRE_TAG: &str = "<strong style=\"color: red;\">";

/// Default closing highlight marker.
pub const DEFAULT_POST_TAG: &str = "</strong>";

/// Highlighting configuration for a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightOptions {
    /// Fields to highlight. Empty means no highlight fields.
    pub fields: Vec<String>,
    /// Marker inserted before each highlighted fragment.
    pub pre_tag: String,
    /// Marker inserted after each highlighted fragment.
    pub post_tag: String,
    /// When set, both markers are forced empty.
    pub disabled: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            pre_tag: DEFAULT_PRE_TAG.to_string(),
            post_tag: DEFAULT_POST_TAG.to_string(),
            disabled: false,
        }
    }
}

impl HighlightOptions {
    /// The markers actually sent to the engine.
    pub fn tags(&self) -> (&str, &str) {
        if self.disabled {
            ("", "")
        } else {
            (self.pre_tag.as_str(), self.post_tag.as_str())
        }
    }
}

/// A paginated search against a logical index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Native query DSL object, e.g. `{"match": {"name": "rust"}}`.
    pub query: Value,
    /// Number of hits to skip.
    pub skip: usize,
    /// Maximum number of hits to return.
    pub size: usize,
    /// Restrict `_source` to these fields.
    pub include_fields: Option<Vec<String>>,
    /// Highlighting configuration.
    pub highlight: HighlightOptions,
}

impl SearchRequest {
    /// Create a request for the first `size` hits of `query`.
    pub fn new(query: Value, size: usize) -> Self {
        Self {
            query,
            skip: 0,
            size,
            include_fields: None,
            highlight: HighlightOptions::default(),
        }
    }

    /// Set the pagination offset.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Restrict the returned source fields.
    pub fn with_include_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Highlight the given fields.
    pub fn with_highlight_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.highlight.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Override the highlight markers.
    pub fn with_highlight_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.highlight.pre_tag = pre.into();
        self.highlight.post_tag = post.into();
        self
    }

    /// Keep highlight fields but emit empty markers.
    pub fn without_highlight_tags(mut self) -> Self {
        self.highlight.disabled = true;
        self
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<T> {
    pub id: String,
    pub score: Option<f64>,
    pub source: T,
    /// Highlighted fragments keyed by field name.
    pub highlight: HashMap<String, Vec<String>>,
}

/// Parsed search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse<T> {
    /// Total number of matching documents reported by the engine.
    pub total: u64,
    pub hits: Vec<SearchHit<T>>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

impl<T: DeserializeOwned> SearchResponse<T> {
    /// Parse an engine search response body.
    ///
    /// `hits.total` may be either a bare number or `{"value": n}` depending
    /// on the engine version.
    pub fn from_json(body: &Value) -> Result<Self, serde_json::Error> {
        let hits = &body["hits"];
        let total = match &hits["total"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            other => other["value"].as_u64().unwrap_or(0),
        };

        let raw_hits: Vec<RawHit> = match hits.get("hits") {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => Vec::new(),
        };

        let hits = raw_hits
            .into_iter()
            .map(|hit| {
                Ok(SearchHit {
                    id: hit.id,
                    score: hit.score,
                    source: serde_json::from_value(hit.source)?,
                    highlight: hit.highlight,
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        Ok(Self { total, hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Product {
        name: String,
    }

    #[test]
    fn test_disabled_highlight_forces_empty_tags() {
        let request = SearchRequest::new(json!({"match_all": {}}), 10)
            .with_highlight_fields(["name"])
            .without_highlight_tags();

        assert_eq!(request.highlight.tags(), ("", ""));
        assert_eq!(request.highlight.fields, vec!["name".to_string()]);
    }

    #[test]
    fn test_default_highlight_tags() {
        let options = HighlightOptions::default();
        assert_eq!(options.tags(), (DEFAULT_PRE_TAG, DEFAULT_POST_TAG));
    }

    #[test]
    fn test_parse_response_with_object_total() {
        let body = json!({
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [
                    {
                        "_id": "p-1",
                        "_score": 1.5,
                        "_source": { "name": "Rust in Action" },
                        "highlight": { "name": ["<em>Rust</em> in Action"] }
                    }
                ]
            }
        });

        let response: SearchResponse<Product> = SearchResponse::from_json(&body).unwrap();

        assert_eq!(response.total, 42);
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].id, "p-1");
        assert_eq!(response.hits[0].score, Some(1.5));
        assert_eq!(response.hits[0].source.name, "Rust in Action");
        assert_eq!(response.hits[0].highlight["name"][0], "<em>Rust</em> in Action");
    }

    #[test]
    fn test_parse_response_with_numeric_total_and_null_score() {
        let body = json!({
            "hits": {
                "total": 3,
                "hits": [{ "_id": "p-2", "_score": null, "_source": { "name": "Other" } }]
            }
        });

        let response: SearchResponse<Product> = SearchResponse::from_json(&body).unwrap();

        assert_eq!(response.total, 3);
        assert!(response.hits[0].score.is_none());
        assert!(response.hits[0].highlight.is_empty());
    }

    #[test]
    fn test_parse_response_source_mismatch_is_error() {
        let body = json!({
            "hits": { "total": 1, "hits": [{ "_id": "x", "_score": 1.0, "_source": { "title": 1 } }] }
        });

        let result: Result<SearchResponse<Product>, _> = SearchResponse::from_json(&body);
        assert!(result.is_err());
    }
}
