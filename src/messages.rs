//! Collector for user-facing annotations about a fit.
//!
//! Fitting routines never write here themselves; callers that present results
//! decide which outcomes deserve a note. Every message is also forwarded to the
//! `log` facade at a matching level.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

/// Messages grouped by severity, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBag {
    pub info: Vec<String>,
    pub warning: Vec<String>,
    pub danger: Vec<String>,
}

impl MessageBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        info!("{msg}");
        self.info.push(msg);
    }

    pub fn warning(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{msg}");
        self.warning.push(msg);
    }

    pub fn danger(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{msg}");
        self.danger.push(msg);
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty() && self.warning.is_empty() && self.danger.is_empty()
    }

    pub fn len(&self) -> usize {
        self.info.len() + self.warning.len() + self.danger.len()
    }

    pub fn has_danger(&self) -> bool {
        !self.danger.is_empty()
    }

    /// Move every message of `other` into `self`.
    pub fn merge(&mut self, other: MessageBag) {
        self.info.extend(other.info);
        self.warning.extend(other.warning);
        self.danger.extend(other.danger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_by_severity() {
        let mut bag = MessageBag::new();
        assert!(bag.is_empty());
        bag.info("fit started");
        bag.warning(String::from("few points"));
        bag.warning("x not evenly spaced");
        assert_eq!(bag.len(), 3);
        assert!(!bag.has_danger());
        assert_eq!(bag.warning, vec!["few points", "x not evenly spaced"]);

        let mut other = MessageBag::new();
        other.danger("diverged");
        bag.merge(other);
        assert!(bag.has_danger());
        assert_eq!(bag.len(), 4);
    }

    #[test]
    fn serializes_as_three_lists() {
        let mut bag = MessageBag::new();
        bag.info("ok");
        let json = serde_json::to_string(&bag).unwrap();
        assert_eq!(json, r#"{"info":["ok"],"warning":[],"danger":[]}"#);
        let back: MessageBag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bag);
    }
}
