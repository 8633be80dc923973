//! Shared request/response types used by API-facing crates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

impl HealthCheckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Query for operations addressing a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    #[default]
    Json,
    /// One `[DIR]  name` / `[FILE] name` line per entry.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDirectoryQuery {
    pub path: String,
    #[serde(default)]
    pub format: ListFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub path: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMultipleFilesRequest {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub path: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_ok_payload() {
        let response = HealthCheckResponse::ok();
        assert_eq!(response.status, "ok");
    }

    #[test]
    fn list_query_defaults_to_json() {
        let query: ListDirectoryQuery =
            serde_json::from_str(r#"{"path":"reports"}"#).expect("deserialize list query");
        assert_eq!(query.format, ListFormat::Json);

        let query: ListDirectoryQuery =
            serde_json::from_str(r#"{"path":"reports","format":"text"}"#)
                .expect("deserialize list query");
        assert_eq!(query.format, ListFormat::Text);
    }

    #[test]
    fn read_many_request_requires_paths() {
        let err = serde_json::from_str::<ReadMultipleFilesRequest>("{}");
        assert!(err.is_err());
    }
}
