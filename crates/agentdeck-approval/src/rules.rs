//! Permission rule matching.
//!
//! A rule is either an exact tool name (`"Write"`) or the shell shorthand
//! `"Bash(<prefix>:*)"`, which covers any `Bash` call whose command starts with
//! `<prefix>`.
//!
//! # Known limitation
//!
//! Matching is deliberately narrow. There is no general globbing, and the
//! prefix shorthand is only recognized for `Bash`. A rule such as
//! `"Read(src/**)"` never matches anything.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const BASH_TOOL: &str = "Bash";

/// Whether `rule` covers a call to `tool_name` with `tool_input`.
#[must_use]
pub fn matches(rule: &str, tool_name: &str, tool_input: &Value) -> bool {
    if rule == tool_name {
        return true;
    }
    if tool_name != BASH_TOOL {
        return false;
    }
    let Some(prefix) = bash_prefix(rule) else {
        return false;
    };
    let Some(command) = command_of(tool_input) else {
        return false;
    };

    let command = command.trim();
    !command.is_empty() && command.starts_with(prefix.trim())
}

/// Extract `<prefix>` from `Bash(<prefix>:*)`.
fn bash_prefix(rule: &str) -> Option<&str> {
    rule.strip_prefix("Bash(")?.strip_suffix(":*)")
}

/// The candidate command: the input itself if it is a string, else its
/// `command` field if that is a string.
fn command_of(input: &Value) -> Option<&str> {
    match input {
        Value::String(s) => Some(s),
        other => other.get("command").and_then(Value::as_str),
    }
}

/// Live allow and deny lists for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRules {
    /// Rules that run without asking.
    pub allowed: Vec<String>,
    /// Rules that are always refused.
    pub disallowed: Vec<String>,
}

impl ToolRules {
    /// Create rules from the two lists.
    #[must_use]
    pub fn new(allowed: Vec<String>, disallowed: Vec<String>) -> Self {
        Self {
            allowed,
            disallowed,
        }
    }

    /// First deny rule covering the call.
    #[must_use]
    pub fn denied_by(&self, tool_name: &str, tool_input: &Value) -> Option<&str> {
        self.disallowed
            .iter()
            .find(|rule| matches(rule, tool_name, tool_input))
            .map(String::as_str)
    }

    /// First allow rule covering the call.
    #[must_use]
    pub fn allowed_by(&self, tool_name: &str, tool_input: &Value) -> Option<&str> {
        self.allowed
            .iter()
            .find(|rule| matches(rule, tool_name, tool_input))
            .map(String::as_str)
    }

    /// Add `entry` to the allow-list (once) and drop it from the deny-list.
    pub fn remember(&mut self, entry: &str) {
        if !self.allowed.iter().any(|rule| rule == entry) {
            self.allowed.push(entry.to_string());
        }
        self.disallowed.retain(|rule| rule != entry);
        debug!(rule = entry, "Remembered permission rule for this session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_match() {
        assert!(matches("Write", "Write", &json!({"file_path": "/x"})));
        assert!(!matches("Write", "Read", &json!({})));
        assert!(!matches("write", "Write", &json!({})));
    }

    #[test]
    fn test_bash_prefix_command_field() {
        let rule = "Bash(git log:*)";
        assert!(matches(rule, "Bash", &json!({"command": "git log --oneline"})));
        assert!(matches(rule, "Bash", &json!({"command": "  git log"})));
        assert!(!matches(rule, "Bash", &json!({"command": "git push"})));
    }

    #[test]
    fn test_bash_prefix_string_input() {
        assert!(matches("Bash(npm test:*)", "Bash", &json!("npm test -- --watch")));
        assert!(!matches("Bash(npm test:*)", "Bash", &json!("npm run build")));
    }

    #[test]
    fn test_bash_prefix_trims_prefix() {
        assert!(matches("Bash( ls :*)", "Bash", &json!({"command": "ls -la"})));
    }

    #[test]
    fn test_empty_or_missing_command() {
        let rule = "Bash(ls:*)";
        assert!(!matches(rule, "Bash", &json!({"command": ""})));
        assert!(!matches(rule, "Bash", &json!({"command": "   "})));
        assert!(!matches(rule, "Bash", &json!({})));
        assert!(!matches(rule, "Bash", &json!({"command": 42})));
        assert!(!matches(rule, "Bash", &Value::Null));
    }

    #[test]
    fn test_shorthand_only_for_bash() {
        assert!(!matches("Read(src:*)", "Read", &json!("src/main.rs")));
        assert!(!matches("Bash(ls:*)", "Shell", &json!({"command": "ls"})));
        assert!(!matches("Bash(ls)", "Bash", &json!({"command": "ls"})));
    }

    #[test]
    fn test_rules_lookup() {
        let rules = ToolRules::new(
            vec!["Read".into(), "Bash(git:*)".into()],
            vec!["Bash(git push:*)".into()],
        );
        let push = json!({"command": "git push origin"});
        assert_eq!(rules.denied_by("Bash", &push), Some("Bash(git push:*)"));
        assert_eq!(rules.allowed_by("Bash", &push), Some("Bash(git:*)"));
        assert_eq!(rules.allowed_by("Read", &json!({})), Some("Read"));
        assert_eq!(rules.denied_by("Read", &json!({})), None);
    }

    #[test]
    fn test_remember_moves_rule() {
        let mut rules = ToolRules::new(vec!["Read".into()], vec!["Write".into()]);
        rules.remember("Write");
        rules.remember("Write");
        assert_eq!(rules.allowed, vec!["Read".to_string(), "Write".to_string()]);
        assert!(rules.disallowed.is_empty());
    }
}
