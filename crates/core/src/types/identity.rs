//! Shopper identity as seen by the cart.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Who the current cart belongs to.
///
/// Passed explicitly to cart code; there is no ambient "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Identity {
    /// No signed-in user. The cart lives in the local slot.
    #[default]
    Anonymous,
    /// A signed-in user. The cart lives in the remote item collection.
    User(UserId),
}

impl Identity {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(*id),
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_identified(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl From<Option<UserId>> for Identity {
    fn from(user: Option<UserId>) -> Self {
        user.map_or(Self::Anonymous, Self::User)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        assert_eq!(Identity::from(None), Identity::Anonymous);

        let id = UserId::new(uuid::Uuid::new_v4());
        assert_eq!(Identity::from(Some(id)), Identity::User(id));
        assert_eq!(Identity::User(id).user(), Some(id));
        assert!(Identity::User(id).is_identified());
        assert!(!Identity::Anonymous.is_identified());
    }

    #[test]
    fn test_session_encoding_round_trips() {
        let id = UserId::new(uuid::Uuid::new_v4());
        for identity in [Identity::Anonymous, Identity::User(id)] {
            let json = serde_json::to_string(&identity).unwrap();
            let back: Identity = serde_json::from_str(&json).unwrap();
            assert_eq!(back, identity);
        }
    }
}
