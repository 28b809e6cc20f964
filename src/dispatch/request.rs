use std::collections::HashMap;

use crate::constants::{QUERY_CLIENT, QUERY_ISSUED_AT, QUERY_SIGNATURE, QUERY_VALID_FOR};
use crate::router::{match_uri, RouteTemplate};

/// Inbound delivery request: route parameters plus the decoded query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Adjusted format as it appeared in the URL
    pub format: String,
    pub id: String,
    pub file: String,
    pub query: HashMap<String, String>,
}

impl DispatchRequest {
    pub fn new(format: impl Into<String>, id: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            id: id.into(),
            file: file.into(),
            query: HashMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Parse a path-and-query string such as
    /// `/media/image/thumb/42/cat.jpg?sig=..&ts=..`. `None` when the path
    /// does not match the route.
    pub fn from_uri(route: &RouteTemplate, uri: &str) -> Option<Self> {
        let (params, query) = match_uri(route, uri)?;
        Some(Self {
            format: params.format,
            id: params.id,
            file: params.file,
            query,
        })
    }

    pub fn signature(&self) -> Option<&str> {
        self.query_param(QUERY_SIGNATURE)
    }

    pub fn issued_at(&self) -> Option<&str> {
        self.query_param(QUERY_ISSUED_AT)
    }

    pub fn valid_for(&self) -> Option<&str> {
        self.query_param(QUERY_VALID_FOR)
    }

    pub fn client(&self) -> Option<&str> {
        self.query_param(QUERY_CLIENT)
    }

    fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}
