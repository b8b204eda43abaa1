use std::fmt;

/// Machine-readable error codes shared by the server, CLI, and client replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InitiativeNotFound,
    UserNotFound,
    ImageNotFound,
    ValidationFailed,
    Unauthenticated,
    StorageFailure,
    InvariantViolation,
    MediaFailure,
    TransportFailure,
    MutationInFlight,
    InternalUnexpected,
}

impl ErrorCode {
    pub const ALL: [Self; 13] = [
        Self::NotInitialized,
        Self::ConfigParseError,
        Self::InitiativeNotFound,
        Self::UserNotFound,
        Self::ImageNotFound,
        Self::ValidationFailed,
        Self::Unauthenticated,
        Self::StorageFailure,
        Self::InvariantViolation,
        Self::MediaFailure,
        Self::TransportFailure,
        Self::MutationInFlight,
        Self::InternalUnexpected,
    ];

    /// Reverse of [`ErrorCode::code`].
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.code() == code)
    }

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InitiativeNotFound => "E2001",
            Self::UserNotFound => "E2002",
            Self::ImageNotFound => "E2005",
            Self::ValidationFailed => "E2003",
            Self::Unauthenticated => "E2004",
            Self::StorageFailure => "E3001",
            Self::InvariantViolation => "E3002",
            Self::MediaFailure => "E4001",
            Self::TransportFailure => "E5001",
            Self::MutationInFlight => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InitiativeNotFound => "Initiative not found",
            Self::UserNotFound => "User not found",
            Self::ImageNotFound => "Image not found",
            Self::ValidationFailed => "Validation failed",
            Self::Unauthenticated => "Not authenticated",
            Self::StorageFailure => "Storage failure",
            Self::InvariantViolation => "Engagement invariant violated",
            Self::MediaFailure => "Media store failure",
            Self::TransportFailure => "Request failed",
            Self::MutationInFlight => "Mutation already in flight",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `gram init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .gram/config.toml and retry."),
            Self::InitiativeNotFound => Some("Check the initiative ID with `gram initiative list`."),
            Self::UserNotFound | Self::ImageNotFound => None,
            Self::ValidationFailed => Some("Provide a user id and non-empty comment text."),
            Self::Unauthenticated => Some("Send the acting user in `x-gram-user` or set --user."),
            Self::StorageFailure => Some("Retry shortly; the store may be busy or unreachable."),
            Self::InvariantViolation => Some("Report a bug; counters disagree with stored rows."),
            Self::MediaFailure => Some("Check the media directory exists and is writable."),
            Self::TransportFailure => Some("Check that the gram server is reachable."),
            Self::MutationInFlight => Some("Wait for the pending vote to settle, then retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }

    /// HTTP status a request failing with this code is answered with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InitiativeNotFound | Self::UserNotFound | Self::ImageNotFound => 404,
            Self::ValidationFailed => 400,
            Self::Unauthenticated => 401,
            Self::MutationInFlight => 409,
            Self::StorageFailure | Self::TransportFailure => 503,
            Self::NotInitialized
            | Self::ConfigParseError
            | Self::InvariantViolation
            | Self::MediaFailure
            | Self::InternalUnexpected => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kinds of record a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Initiative,
    User,
    Image,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiative => f.write_str("Initiative"),
            Self::User => f.write_str("User"),
            Self::Image => f.write_str("Image"),
        }
    }
}

/// Failures surfaced by the engagement store and the services over it.
///
/// These are never swallowed on the vote/comment mutation paths: every
/// variant reaches the caller as a structured failure.
#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    /// The named entity does not exist (`"Initiative not found"`).
    #[error("{entity} not found")]
    NotFound { entity: Entity, id: String },

    /// Missing or malformed input.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// No acting user, or the acting user does not match the request.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// The store was unreachable or the atomic operation itself failed.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl EngagementError {
    #[must_use]
    pub fn initiative_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::Initiative,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn image_not_found(initiative_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::Image,
            id: initiative_id.into(),
        }
    }

    #[must_use]
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::User,
            id: id.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound {
                entity: Entity::Initiative,
                ..
            } => ErrorCode::InitiativeNotFound,
            Self::NotFound {
                entity: Entity::User,
                ..
            } => ErrorCode::UserNotFound,
            Self::NotFound {
                entity: Entity::Image,
                ..
            } => ErrorCode::ImageNotFound,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::Unauthenticated(_) => ErrorCode::Unauthenticated,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Optional remediation hint for operators and users.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
