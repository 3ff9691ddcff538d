//! Rule lists and the ordered pre-classification checks
//!
//! Checks run in a fixed order and the first match decides:
//! 1. sender contains a benign domain -> not spam
//! 2. sender contains a malicious domain -> spam
//! 3. empty body, or a blocked phrase in the body (any case) or in the
//!    subject (exact case) -> spam
//!
//! No match means the message goes to the external classifier.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Verdict;

/// Rules filename in the Sift config directory
const RULES_FILE: &str = "filter-rules.json";

/// Configurable rule lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Sender substrings treated as known-good (typically `@domain`)
    pub benign_domains: Vec<String>,
    /// Sender substrings treated as known spam
    pub malicious_domains: Vec<String>,
    /// Phrases that mark a message as spam
    pub blocked_phrases: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            benign_domains: vec!["@bankofamerica.com".to_string()],
            malicious_domains: vec!["@contact.kamalaharris.com".to_string()],
            blocked_phrases: [
                "free gift",
                "free offer",
                "promotional offer",
                "donate",
                "donating",
                "donation",
                "Obama",
                "Kamala",
                "Walz",
                "Trump",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl FilterRules {
    /// Load rules from the process environment and config directory
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load rules through an arbitrary variable lookup
    ///
    /// Priority:
    /// 1. JSON file named by `SIFT_RULES_PATH`
    /// 2. `~/.config/sift/filter-rules.json`
    /// 3. Built-in defaults, with any of `SIFT_BENIGN_DOMAINS`,
    ///    `SIFT_MALICIOUS_DOMAINS` and `SIFT_BLOCKED_PHRASES`
    ///    (comma-separated) replacing the matching list
    ///
    /// Blank values count as unset.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::load_layered(lookup, config::config_path(RULES_FILE).as_deref())
    }

    fn load_layered(
        lookup: impl Fn(&str) -> Option<String>,
        config_file: Option<&Path>,
    ) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("SIFT_RULES_PATH") {
            return Self::from_file(Path::new(path.trim()));
        }
        if let Some(path) = config_file
            && path.is_file()
        {
            return Self::from_file(path);
        }

        Ok(Self::from_lists(var))
    }

    /// Load rules from a JSON file; missing lists fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Defaults overridden by comma-separated lists from `lookup`
    ///
    /// A blank list leaves the default in place.
    pub fn from_lists(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut rules = Self::default();

        if let Some(list) = lookup("SIFT_BENIGN_DOMAINS") {
            rules.benign_domains = split_list(&list);
        }
        if let Some(list) = lookup("SIFT_MALICIOUS_DOMAINS") {
            rules.malicious_domains = split_list(&list);
        }
        if let Some(list) = lookup("SIFT_BLOCKED_PHRASES") {
            rules.blocked_phrases = split_list(&list);
        }

        rules
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Why a message skipped external classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    KnownBenignDomain,
    KnownMaliciousDomain,
    EmptyOrBlockedPhrase,
}

impl SkipReason {
    /// Final verdict implied by this shortcut
    pub fn verdict(self) -> Verdict {
        match self {
            SkipReason::KnownBenignDomain => Verdict::NotSpam,
            SkipReason::KnownMaliciousDomain | SkipReason::EmptyOrBlockedPhrase => Verdict::Spam,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SkipReason::KnownBenignDomain => "known marketing domain",
            SkipReason::KnownMaliciousDomain => "known blacklisted domain",
            SkipReason::EmptyOrBlockedPhrase => "empty or specific keyword email",
        }
    }
}

/// Compiled form of [`FilterRules`]
#[derive(Debug, Clone)]
pub struct RuleFilter {
    benign_domains: Vec<String>,
    malicious_domains: Vec<String>,
    blocked_phrases: Vec<String>,
    blocked_phrases_lower: Vec<String>,
}

impl RuleFilter {
    pub fn new(rules: FilterRules) -> Self {
        // An empty entry would match every message
        let non_empty =
            |list: Vec<String>| list.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>();

        let blocked_phrases = non_empty(rules.blocked_phrases);
        let blocked_phrases_lower = blocked_phrases.iter().map(|p| p.to_lowercase()).collect();

        Self {
            benign_domains: non_empty(rules.benign_domains),
            malicious_domains: non_empty(rules.malicious_domains),
            blocked_phrases,
            blocked_phrases_lower,
        }
    }

    /// Run the ordered checks; `Some` carries a final verdict via [`SkipReason::verdict`]
    ///
    /// Body phrase matching ignores case, subject phrase matching does not.
    pub fn should_skip_classification(
        &self,
        sender: &str,
        subject: &str,
        body: &str,
    ) -> Option<SkipReason> {
        if self.benign_domains.iter().any(|d| sender.contains(d.as_str())) {
            return Some(SkipReason::KnownBenignDomain);
        }

        if self.malicious_domains.iter().any(|d| sender.contains(d.as_str())) {
            return Some(SkipReason::KnownMaliciousDomain);
        }

        let body_lower = body.to_lowercase();
        if body.is_empty()
            || self.blocked_phrases_lower.iter().any(|p| body_lower.contains(p.as_str()))
            || self.blocked_phrases.iter().any(|p| subject.contains(p.as_str()))
        {
            return Some(SkipReason::EmptyOrBlockedPhrase);
        }

        None
    }
}

impl Default for RuleFilter {
    fn default() -> Self {
        Self::new(FilterRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_benign_domain_is_not_spam() {
        let filter = RuleFilter::default();
        let reason = filter.should_skip_classification(
            "Bank of America <alerts@bankofamerica.com>",
            "Your statement",
            "Statement ready",
        );
        assert_eq!(reason, Some(SkipReason::KnownBenignDomain));
        assert_eq!(reason.unwrap().verdict(), Verdict::NotSpam);
    }

    #[test]
    fn test_benign_domain_wins_over_phrases() {
        let filter = RuleFilter::default();
        let reason = filter.should_skip_classification(
            "alerts@bankofamerica.com",
            "Free gift inside",
            "",
        );
        assert_eq!(reason, Some(SkipReason::KnownBenignDomain));
    }

    #[test]
    fn test_malicious_domain_is_spam() {
        let filter = RuleFilter::default();
        let reason = filter.should_skip_classification(
            "info@contact.kamalaharris.com",
            "Hello",
            "A perfectly normal message",
        );
        assert_eq!(reason, Some(SkipReason::KnownMaliciousDomain));
        assert_eq!(reason.unwrap().verdict(), Verdict::Spam);
    }

    #[test]
    fn test_empty_body_is_spam() {
        let filter = RuleFilter::default();
        let reason = filter.should_skip_classification("friend@example.com", "Hi", "");
        assert_eq!(reason, Some(SkipReason::EmptyOrBlockedPhrase));
    }

    #[test]
    fn test_body_phrase_ignores_case() {
        let filter = RuleFilter::default();
        let reason = filter.should_skip_classification(
            "friend@example.com",
            "Weekend",
            "Claim your FREE Gift today",
        );
        assert_eq!(reason, Some(SkipReason::EmptyOrBlockedPhrase));

        // Capitalised phrases match lowercase body text too
        let reason =
            filter.should_skip_classification("friend@example.com", "Weekend", "news about obama");
        assert_eq!(reason, Some(SkipReason::EmptyOrBlockedPhrase));
    }

    #[test]
    fn test_subject_phrase_is_case_sensitive() {
        let filter = RuleFilter::default();
        assert_eq!(
            filter.should_skip_classification("friend@example.com", "Please Donate", "hello"),
            None
        );
        assert_eq!(
            filter.should_skip_classification("friend@example.com", "Please donate", "hello"),
            Some(SkipReason::EmptyOrBlockedPhrase)
        );
    }

    #[test]
    fn test_no_rule_matches() {
        let filter = RuleFilter::default();
        assert_eq!(
            filter.should_skip_classification("friend@example.com", "Lunch?", "Are you free at noon?"),
            None
        );
    }

    #[test]
    fn test_empty_entries_are_ignored() {
        let filter = RuleFilter::new(FilterRules {
            benign_domains: vec![String::new()],
            malicious_domains: vec![],
            blocked_phrases: vec![String::new()],
        });
        assert_eq!(
            filter.should_skip_classification("anyone@example.com", "Subject", "Body"),
            None
        );
    }

    #[test]
    fn test_rules_from_lists() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SIFT_BENIGN_DOMAINS", "@good.example, @bank.example ,"),
            ("SIFT_BLOCKED_PHRASES", "lottery"),
        ]);
        let rules = FilterRules::from_lists(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(rules.benign_domains, vec!["@good.example", "@bank.example"]);
        assert_eq!(rules.malicious_domains, FilterRules::default().malicious_domains);
        assert_eq!(rules.blocked_phrases, vec!["lottery"]);
    }

    #[test]
    fn test_rules_from_file_keeps_missing_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{ "malicious_domains": ["@spam.example"] }"#).unwrap();

        let rules = FilterRules::from_file(&path).unwrap();
        assert_eq!(rules.malicious_domains, vec!["@spam.example"]);
        assert_eq!(rules.benign_domains, FilterRules::default().benign_domains);
    }

    #[test]
    fn test_rules_path_wins_over_env_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{ "blocked_phrases": ["crypto giveaway"] }"#).unwrap();

        let path_str = path.to_string_lossy().into_owned();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SIFT_RULES_PATH", path_str.as_str()),
            ("SIFT_BLOCKED_PHRASES", "lottery"),
        ]);
        let rules = FilterRules::load_with(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(rules.blocked_phrases, vec!["crypto giveaway"]);
    }

    #[test]
    fn test_config_file_wins_over_env_lists() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("filter-rules.json");
        std::fs::write(&config_file, r#"{ "benign_domains": ["@payroll.example"] }"#).unwrap();

        let env: HashMap<&str, &str> = HashMap::from([("SIFT_BENIGN_DOMAINS", "@good.example")]);
        let rules = FilterRules::load_layered(
            |key| env.get(key).map(|v| v.to_string()),
            Some(&config_file),
        )
        .unwrap();

        assert_eq!(rules.benign_domains, vec!["@payroll.example"]);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let missing_config = dir.path().join("filter-rules.json");

        let env: HashMap<&str, &str> = HashMap::from([
            ("SIFT_RULES_PATH", ""),
            ("SIFT_BLOCKED_PHRASES", "  "),
            ("SIFT_MALICIOUS_DOMAINS", "@spam.example"),
        ]);
        let rules = FilterRules::load_layered(
            |key| env.get(key).map(|v| v.to_string()),
            Some(&missing_config),
        )
        .unwrap();

        assert_eq!(rules.blocked_phrases, FilterRules::default().blocked_phrases);
        assert_eq!(rules.malicious_domains, vec!["@spam.example"]);
    }
}
