//! JSON bodies exchanged over HTTP, shared by the server and the HTTP client.
//!
//! Field names are camelCase on the wire.

use crate::error::{EngagementError, ErrorCode};
use crate::model::{Comment, Initiative};
use serde::{Deserialize, Serialize};

/// Header carrying the authenticated acting user.
pub const USER_HEADER: &str = "x-gram-user";

pub const INITIATIVE_CREATED: &str = "Initiative created successfully!";
pub const COMMENT_ADDED: &str = "Comment added successfully!";

/// `POST /initiatives/vote/:id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// `POST /initiatives/comment/:id`. `comment` is accepted for `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, alias = "comment", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub message: String,
    pub comment: Comment,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInitiativeResponse {
    pub message: String,
    pub initiative: Initiative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            code: code.code().to_string(),
        }
    }
}

impl From<&EngagementError> for ErrorBody {
    fn from(err: &EngagementError) -> Self {
        Self::new(err.to_string(), err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_request_accepts_legacy_field_name() {
        let body: CommentRequest =
            serde_json::from_str(r#"{"userId":"u1","comment":"hi"}"#).expect("parse");
        assert_eq!(body.user_id.as_deref(), Some("u1"));
        assert_eq!(body.text.as_deref(), Some("hi"));

        let body: CommentRequest = serde_json::from_str(r#"{"text":"hey"}"#).expect("parse");
        assert!(body.user_id.is_none());
        assert_eq!(body.text.as_deref(), Some("hey"));
    }

    #[test]
    fn error_body_carries_message_and_code() {
        let body = ErrorBody::from(&EngagementError::initiative_not_found("in-x"));
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["message"], "Initiative not found");
        assert_eq!(json["code"], "E2001");
    }
}
