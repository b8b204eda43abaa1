use crate::error::EngagementError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const MAX_USER_ID_LEN: usize = 64;

/// Opaque identifier of the acting member, supplied by the identity provider.
///
/// Well formed means: non-empty, no surrounding whitespace, at most
/// [`MAX_USER_ID_LEN`] characters drawn from ASCII alphanumerics and `-_.@:`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parse and validate a raw user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Validation`] on `userId` when the value is
    /// empty or malformed.
    pub fn parse(raw: &str) -> Result<Self, EngagementError> {
        if raw.is_empty() {
            return Err(EngagementError::validation("userId", "is required"));
        }
        if raw.trim() != raw {
            return Err(EngagementError::validation(
                "userId",
                "must not start or end with whitespace",
            ));
        }
        if raw.chars().count() > MAX_USER_ID_LEN {
            return Err(EngagementError::validation(
                "userId",
                format!("must be <= {MAX_USER_ID_LEN} characters"),
            ));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
        {
            return Err(EngagementError::validation(
                "userId",
                "may only contain ASCII letters, digits, and -_.@:",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = EngagementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of profile genders; anything not stated is `Unspecified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = EngagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "" | "unspecified" => Ok(Self::Unspecified),
            other => Err(EngagementError::validation(
                "gender",
                format!("unknown value '{other}': expected male, female, or unspecified"),
            )),
        }
    }
}

/// Member profile used to resolve initiative creators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub fullname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_no: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_opaque_ids() {
        for raw in ["64f0c2a9e1b2c3d4e5f60718", "alice", "user:42", "a.b-c_d@e"] {
            assert_eq!(UserId::parse(raw).expect("valid id").as_str(), raw);
        }
    }

    #[test]
    fn parse_rejects_missing_and_malformed() {
        let long = "x".repeat(65);
        for raw in ["", " alice", "alice ", "al ice", "drop;table", long.as_str()] {
            let err = UserId::parse(raw).expect_err("should reject");
            assert!(err.to_string().starts_with("invalid userId"), "{err}");
        }
    }

    #[test]
    fn user_id_deserializes_through_validation() {
        let ok: UserId = serde_json::from_str("\"alice\"").expect("valid");
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn gender_parses_legacy_capitalized_values() {
        assert_eq!("Male".parse::<Gender>().expect("male"), Gender::Male);
        assert_eq!("Female".parse::<Gender>().expect("female"), Gender::Female);
        assert_eq!("".parse::<Gender>().expect("empty"), Gender::Unspecified);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn user_without_gender_defaults_to_unspecified() {
        let user: User = serde_json::from_str(r#"{"id":"u1","fullname":"Asha"}"#).expect("parse");
        assert_eq!(user.gender, Gender::Unspecified);
        assert!(user.email.is_none());
    }
}
