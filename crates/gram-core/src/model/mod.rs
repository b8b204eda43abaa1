//! Domain records owned by the engagement store.

pub mod comment;
pub mod initiative;
pub mod user;

pub use comment::{Comment, CommentId, CommentReceipt};
pub use initiative::{Initiative, InitiativeId, InitiativeView, NewInitiative, VoteTally};
pub use user::{Gender, User, UserId};

use chrono::{DateTime, Utc};

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

/// Convert stored microseconds back into a UTC timestamp.
///
/// Out-of-range values clamp to the epoch rather than failing a read.
#[must_use]
pub fn micros_to_datetime(us: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_micros(us).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
