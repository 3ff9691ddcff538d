//! Static allow/deny rules applied before any external classification

mod rules;

pub use rules::{FilterRules, RuleFilter, SkipReason};
