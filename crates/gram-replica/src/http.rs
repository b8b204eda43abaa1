//! HTTP transport against a running `gram serve`.

use crate::transport::{EngagementTransport, TransportError};
use async_trait::async_trait;
use gram_core::api::{
    CommentRequest, CommentResponse, CreateInitiativeResponse, ErrorBody, USER_HEADER, VoteRequest,
};
use gram_core::model::{Comment, CommentReceipt, Initiative, InitiativeId, InitiativeView, UserId, VoteTally};
use gram_core::service::ImageUpload;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to the server's JSON routes. The acting user travels in the
/// `x-gram-user` header as well as the body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /initiatives` as multipart form data.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails or is rejected.
    pub async fn create_initiative(
        &self,
        title: &str,
        description: &str,
        creator: &UserId,
        image: Option<ImageUpload>,
    ) -> Result<Initiative, TransportError> {
        let mut form = Form::new()
            .text("title", title.to_string())
            .text("description", description.to_string())
            .text("creatorId", creator.to_string());
        if let Some(image) = image {
            form = form.part("image", Part::bytes(image.bytes).file_name(image.file_name));
        }

        let response = self
            .client
            .post(self.url("/initiatives"))
            .header(USER_HEADER, creator.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(network)?;
        let created: CreateInitiativeResponse = decode(response).await?;
        Ok(created.initiative)
    }
}

fn network(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, TransportError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<R>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => TransportError::Rejected {
            status: status.as_u16(),
            code: Some(error.code),
            message: error.message,
        },
        Err(_) => TransportError::Rejected {
            status: status.as_u16(),
            code: None,
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            },
        },
    })
}

#[async_trait]
impl EngagementTransport for HttpTransport {
    async fn list_initiatives(&self) -> Result<Vec<InitiativeView>, TransportError> {
        let response = self
            .client
            .get(self.url("/initiatives"))
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn toggle_vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
    ) -> Result<VoteTally, TransportError> {
        let response = self
            .client
            .post(self.url(&format!("/initiatives/vote/{initiative_id}")))
            .header(USER_HEADER, user_id.as_str())
            .json(&VoteRequest {
                user_id: Some(user_id.to_string()),
            })
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn append_comment(
        &self,
        initiative_id: &InitiativeId,
        author: &UserId,
        text: &str,
    ) -> Result<CommentReceipt, TransportError> {
        let response = self
            .client
            .post(self.url(&format!("/initiatives/comment/{initiative_id}")))
            .header(USER_HEADER, author.as_str())
            .json(&CommentRequest {
                user_id: Some(author.to_string()),
                text: Some(text.to_string()),
            })
            .send()
            .await
            .map_err(network)?;
        let created: CommentResponse = decode(response).await?;
        Ok(CommentReceipt {
            comment: created.comment,
            comment_count: created.comment_count,
        })
    }

    async fn comments(&self, initiative_id: &InitiativeId) -> Result<Vec<Comment>, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/initiatives/comment/{initiative_id}")))
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTransport;
    use crate::transport::{EngagementTransport, TransportError};
    use gram_core::ErrorCode;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://127.0.0.1:8080/").expect("client");
        assert_eq!(transport.base_url(), "http://127.0.0.1:8080");
        assert_eq!(
            transport.url("/initiatives"),
            "http://127.0.0.1:8080/initiatives"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let transport = HttpTransport::new(format!("http://{addr}")).expect("client");
        let err = transport.list_initiatives().await.expect_err("refused");
        assert!(matches!(err, TransportError::Network(_)));
        assert_eq!(err.code(), ErrorCode::TransportFailure);
    }
}
