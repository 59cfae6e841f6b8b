//! Outbound request description.

use std::collections::BTreeMap;
use url::Url;

/// A fully resolved POST: URL with query, body and extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRequest {
    pub url: Url,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl NetworkRequest {
    /// JSON POST to `url`.
    pub fn post_json(url: Url, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            url,
            body,
            headers,
        }
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}
