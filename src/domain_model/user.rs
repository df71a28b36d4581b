use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a registered user as issued by the account service.
///
/// Never empty: the constructor is the boundary check for every caller that
/// mints or revokes tokens.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user id must not be empty")]
pub struct EmptyUserId;

impl UserId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, EmptyUserId> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(EmptyUserId);
        }
        Ok(UserId(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = EmptyUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserId::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = EmptyUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::parse(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// Identity resolved for one authenticated request, threaded explicitly
/// into the handlers that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestIdentity {
    pub user_id: UserId,
}
