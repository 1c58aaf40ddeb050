//! Startup configuration for an [`Api`](crate::Api).

use serde::Deserialize;

use crate::representation::{APPLICATION_JSON, JsonSettings};

/// Every field has a default, so a partial document is enough:
///
/// ```rust
/// use astor_restful::ApiConfig;
///
/// let config: ApiConfig = serde_json::from_str(r#"{"prefix": "/v1", "catch_all_404": true}"#).unwrap();
/// assert_eq!(config.default_mediatype.as_deref(), Some("application/json"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Prepended to every resource URL, e.g. `/v1`.
    pub prefix: String,

    /// Media type used when the client's `Accept` header matches nothing.
    /// `None` answers such requests with `406 Not Acceptable`.
    pub default_mediatype: Option<String>,

    /// Render unmatched routes through the error pipeline instead of the
    /// router's bare 404.
    pub catch_all_404: bool,

    pub json: JsonSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            default_mediatype: Some(APPLICATION_JSON.to_owned()),
            catch_all_404: false,
            json: JsonSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: ApiConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ApiConfig::default());
    }

    #[test]
    fn null_default_mediatype_disables_fallback() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"default_mediatype": null, "json": {"pretty": true}}"#).unwrap();
        assert_eq!(config.default_mediatype, None);
        assert!(config.json.pretty);
    }
}
