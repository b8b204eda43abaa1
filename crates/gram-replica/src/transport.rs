//! How engine requests reach the authoritative store.

use async_trait::async_trait;
use gram_core::ErrorCode;
use gram_core::error::EngagementError;
use gram_core::model::{Comment, CommentReceipt, InitiativeId, InitiativeView, UserId, VoteTally};
use gram_core::service::{CommentService, VoteService};
use gram_core::store::EngagementStore;

/// A failed request. Every variant makes the engine roll back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response whose body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { status, code, .. } => code
                .as_deref()
                .and_then(ErrorCode::from_code)
                .unwrap_or(match status {
                    404 => ErrorCode::InitiativeNotFound,
                    400 => ErrorCode::ValidationFailed,
                    401 => ErrorCode::Unauthenticated,
                    503 => ErrorCode::StorageFailure,
                    _ => ErrorCode::InternalUnexpected,
                }),
            Self::Network(_) | Self::Decode(_) => ErrorCode::TransportFailure,
        }
    }
}

impl From<EngagementError> for TransportError {
    fn from(err: EngagementError) -> Self {
        let code = err.code();
        Self::Rejected {
            status: code.http_status(),
            code: Some(code.code().to_string()),
            message: err.to_string(),
        }
    }
}

/// Request surface the engine depends on.
#[async_trait]
pub trait EngagementTransport: Send + Sync {
    async fn list_initiatives(&self) -> Result<Vec<InitiativeView>, TransportError>;

    async fn toggle_vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
    ) -> Result<VoteTally, TransportError>;

    async fn append_comment(
        &self,
        initiative_id: &InitiativeId,
        author: &UserId,
        text: &str,
    ) -> Result<CommentReceipt, TransportError>;

    async fn comments(&self, initiative_id: &InitiativeId) -> Result<Vec<Comment>, TransportError>;
}

/// In-process transport: calls the services directly on the blocking pool.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    store: EngagementStore,
    votes: VoteService,
    comments: CommentService,
}

impl LocalTransport {
    #[must_use]
    pub fn new(store: EngagementStore) -> Self {
        Self {
            votes: VoteService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            store,
        }
    }

    #[must_use]
    pub fn with_max_comment_chars(mut self, max_chars: usize) -> Self {
        self.comments = self.comments.with_max_chars(max_chars);
        self
    }
}

async fn blocking<R, F>(f: F) -> Result<R, TransportError>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R, EngagementError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| TransportError::Network(err.to_string()))?
        .map_err(TransportError::from)
}

#[async_trait]
impl EngagementTransport for LocalTransport {
    async fn list_initiatives(&self) -> Result<Vec<InitiativeView>, TransportError> {
        let store = self.store.clone();
        blocking(move || store.list_initiatives()).await
    }

    async fn toggle_vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
    ) -> Result<VoteTally, TransportError> {
        let votes = self.votes.clone();
        let (id, user) = (initiative_id.to_string(), user_id.to_string());
        blocking(move || votes.toggle(&id, Some(&user))).await
    }

    async fn append_comment(
        &self,
        initiative_id: &InitiativeId,
        author: &UserId,
        text: &str,
    ) -> Result<CommentReceipt, TransportError> {
        let comments = self.comments.clone();
        let (id, author, text) = (initiative_id.to_string(), author.to_string(), text.to_string());
        blocking(move || comments.append(&id, Some(&author), Some(&text))).await
    }

    async fn comments(&self, initiative_id: &InitiativeId) -> Result<Vec<Comment>, TransportError> {
        let comments = self.comments.clone();
        let id = initiative_id.to_string();
        blocking(move || comments.list(&id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gram_core::model::NewInitiative;

    #[test]
    fn rejected_code_prefers_body_code_over_status() {
        let err = TransportError::Rejected {
            status: 500,
            code: Some("E3001".into()),
            message: "storage failure".into(),
        };
        assert_eq!(err.code(), ErrorCode::StorageFailure);

        let err = TransportError::Rejected {
            status: 404,
            code: None,
            message: "Initiative not found".into(),
        };
        assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
        assert_eq!(
            TransportError::Network("refused".into()).code(),
            ErrorCode::TransportFailure
        );
    }

    #[tokio::test]
    async fn local_transport_maps_service_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = EngagementStore::open(dir.path().join("gram.sqlite3")).expect("open");
        let initiative = store
            .create_initiative(&NewInitiative {
                title: "Local".into(),
                description: String::new(),
                creator: UserId::parse("creator").expect("id"),
                image_url: None,
            })
            .expect("create");
        let transport = LocalTransport::new(store);
        let alice = UserId::parse("alice").expect("id");

        let tally = transport
            .toggle_vote(&initiative.id, &alice)
            .await
            .expect("vote");
        assert_eq!(tally.vote_count, 1);

        let err = transport
            .append_comment(&initiative.id, &alice, "   ")
            .await
            .expect_err("blank");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(matches!(err, TransportError::Rejected { status: 400, .. }));

        let missing = InitiativeId::parse("in-missing").expect("id");
        let err = transport.comments(&missing).await.expect_err("absent");
        assert_eq!(err.to_string(), "Initiative not found");
    }
}
