//! Module events.
//!
//! One event per successful message, naming the operation, the addresses
//! involved and the denom. Amounts are never attached, not even the
//! plaintext deposit and withdraw amounts, so an indexer learns nothing a
//! block explorer would not.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ATTR_ADDRESS: &str = "address";
pub const ATTR_SENDER: &str = "sender";
pub const ATTR_RECIPIENT: &str = "recipient";
pub const ATTR_AUDITOR: &str = "auditor";
pub const ATTR_DENOM: &str = "denom";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    InitializeAccount,
    Deposit,
    Withdraw,
    ApplyPendingBalance,
    Transfer,
    CloseAccount,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::InitializeAccount => "initialize_account",
            EventKind::Deposit => "deposit",
            EventKind::Withdraw => "withdraw",
            EventKind::ApplyPendingBalance => "apply_pending_balance",
            EventKind::Transfer => "transfer",
            EventKind::CloseAccount => "close_account",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    /// First value recorded under `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded under `key`, in order.
    pub fn attributes_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let event = Event::new(EventKind::Transfer)
            .with(ATTR_SENDER, "a")
            .with(ATTR_RECIPIENT, "b")
            .with(ATTR_AUDITOR, "x")
            .with(ATTR_AUDITOR, "y");
        assert_eq!(event.attribute(ATTR_SENDER), Some("a"));
        assert_eq!(event.attribute(ATTR_DENOM), None);
        assert_eq!(
            event.attributes_named(ATTR_AUDITOR).collect::<Vec<_>>(),
            vec!["x", "y"]
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(EventKind::ApplyPendingBalance.to_string(), "apply_pending_balance");
        assert_eq!(EventKind::CloseAccount.as_str(), "close_account");
    }
}
