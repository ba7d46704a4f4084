use finops_warehouse::IdleResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Envelope wrapping every API payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ApiStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { status: ApiStatus::Success, data: Some(data), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Error, data: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskStructuredData {
    pub documents_retrieved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub data_type: String,
    #[serde(default)]
    pub structured_data: Option<AskStructuredData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationQuery {
    pub month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendation_type: String,
    pub details: Vec<IdleResource>,
}
