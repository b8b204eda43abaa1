//! Acting-user context, taken from the `x-gram-user` header.

use crate::error::ApiError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gram_core::ErrorCode;
use gram_core::api::USER_HEADER;
use gram_core::error::EngagementError;
use gram_core::model::UserId;

/// Who the identity provider says is acting. Absent when the request carries
/// no `x-gram-user` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    user: Option<UserId>,
}

impl AuthContext {
    #[must_use]
    pub const fn new(user: Option<UserId>) -> Self {
        Self { user }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Reconcile the body's `userId` with the authenticated user.
    ///
    /// A body id must match the header when both are present. Without a body
    /// id the header user acts. With neither, `None` is returned and the
    /// service reports the missing user.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Unauthenticated`] when the two disagree.
    pub fn acting_user(&self, claimed: Option<String>) -> Result<Option<String>, EngagementError> {
        match (&self.user, claimed) {
            (Some(user), Some(claimed)) if user.as_str() != claimed => {
                Err(EngagementError::Unauthenticated(format!(
                    "userId '{claimed}' does not match the authenticated user"
                )))
            }
            (_, Some(claimed)) => Ok(Some(claimed)),
            (Some(user), None) => Ok(Some(user.to_string())),
            (None, None) => Ok(None),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_HEADER) else {
            return Ok(Self::default());
        };
        let raw = value.to_str().map_err(|_| {
            ApiError::new(
                ErrorCode::Unauthenticated,
                format!("{USER_HEADER} is not valid text"),
            )
        })?;
        let user = UserId::parse(raw).map_err(|err| {
            ApiError::new(ErrorCode::Unauthenticated, format!("{USER_HEADER}: {err}"))
        })?;
        Ok(Self::new(Some(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(user: Option<&str>) -> AuthContext {
        AuthContext::new(user.map(|u| UserId::parse(u).expect("user")))
    }

    #[test]
    fn body_user_must_match_header_user() {
        let err = ctx(Some("alice"))
            .acting_user(Some("mallory".into()))
            .expect_err("mismatch");
        assert_eq!(err.code(), ErrorCode::Unauthenticated);

        assert_eq!(
            ctx(Some("alice")).acting_user(Some("alice".into())).expect("match"),
            Some("alice".to_string())
        );
    }

    #[test]
    fn header_fills_in_a_missing_body_user() {
        assert_eq!(
            ctx(Some("alice")).acting_user(None).expect("header"),
            Some("alice".to_string())
        );
        assert_eq!(ctx(None).acting_user(None).expect("neither"), None);
        assert_eq!(
            ctx(None).acting_user(Some("bob".into())).expect("body only"),
            Some("bob".to_string())
        );
    }
}
