use serde::{Deserialize, Serialize};
use std::fmt;

/// LDAP message identifier
///
/// `MessageID ::= INTEGER (0 .. maxInt)` with `maxInt` = 2^31 - 1. The value
/// is validated on construction, so every `MessageId` in memory is encodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MessageId(u32);

impl MessageId {
    /// Largest legal message ID
    pub const MAX: u32 = 0x7FFF_FFFF;

    /// Create a message ID, returning `None` when out of range
    pub fn new(value: u32) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Get the numeric value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for MessageId {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        MessageId::new(value).ok_or_else(|| format!("message ID {} is out of range", value))
    }
}

impl From<MessageId> for u32 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_range() {
        assert_eq!(MessageId::new(5).unwrap().value(), 5);
        assert!(MessageId::new(MessageId::MAX).is_some());
        assert!(MessageId::new(MessageId::MAX + 1).is_none());
    }

    #[test]
    fn test_message_id_serde_rejects_out_of_range() {
        let id: MessageId = serde_json::from_str("42").unwrap();
        assert_eq!(id.value(), 42);
        assert!(serde_json::from_str::<MessageId>("4294967295").is_err());
    }
}
