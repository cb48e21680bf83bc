use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's opaque identifier as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// The authenticated caller, passed explicitly into every operation that
/// needs one. Never read from ambient state, so domain logic stays testable
/// without a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email_verified: bool,
}

impl CurrentUser {
    pub fn verified(id: impl Into<String>) -> Self {
        CurrentUser {
            id: UserId(id.into()),
            email_verified: true,
        }
    }

    pub fn unverified(id: impl Into<String>) -> Self {
        CurrentUser {
            id: UserId(id.into()),
            email_verified: false,
        }
    }
}
