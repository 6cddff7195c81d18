// ── Gateway firewall rules ──

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    Allow,
    Drop,
    Reject,
}

/// One rule inside a gateway policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Server-side id; `None` until the policy has been patched.
    pub id: Option<String>,
    pub display_name: String,
    pub sequence_number: u32,
    pub action: RuleAction,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub services: Vec<String>,
    pub scope: Vec<String>,
    pub logged: bool,
}

impl Rule {
    /// An unlogged ALLOW rule with no id yet.
    pub fn allow(display_name: impl Into<String>, sequence_number: u32) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            sequence_number,
            action: RuleAction::Allow,
            sources: Vec::new(),
            destinations: Vec::new(),
            services: Vec::new(),
            scope: Vec::new(),
            logged: false,
        }
    }

    /// Case-insensitive match on id or display name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.display_name.eq_ignore_ascii_case(name)
            || self
                .id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(name))
    }
}

/// Ordered rules of one policy.
///
/// Sequence numbers are unique within a set. `insert` assigns the lowest
/// unused non-negative number, so gaps left by deleted rules are refilled
/// before the set grows past its current maximum.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.answers_to(name))
    }

    /// Smallest non-negative integer no rule currently uses.
    pub fn next_sequence_number(&self) -> u32 {
        let used: BTreeSet<u32> = self.rules.iter().map(|r| r.sequence_number).collect();
        (0..).find(|n| !used.contains(n)).unwrap_or(u32::MAX)
    }

    /// Builds a rule at the next free sequence number and appends it.
    pub fn insert_with(&mut self, name: &str, build: impl FnOnce(&str, u32) -> Rule) -> &Rule {
        let seq = self.next_sequence_number();
        let mut rule = build(name, seq);
        rule.sequence_number = seq;
        self.rules.push(rule);
        let last = self.rules.len() - 1;
        &self.rules[last]
    }
}
