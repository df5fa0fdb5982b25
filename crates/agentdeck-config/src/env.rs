//! Environment variable fallbacks.
//!
//! Env vars are a fallback, not an override: each one is applied only when the
//! config file left the corresponding field unset.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Integer,
    String,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "CLAUDE_TOOL_APPROVAL_TIMEOUT_MS",
        field_path: "approvals.timeout_ms",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "CONTEXT_WINDOW",
        field_path: "model.context_window",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "AGENTDECK_DEFAULT_MODEL",
        field_path: "model.default",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "AGENTDECK_CLAUDE_PATH",
        field_path: "runtime.executable",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "AGENTDECK_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::String,
    },
];

/// Apply env fallbacks to every mapped field missing from `tree`.
///
/// Returns the names of the variables that were applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    tree: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Vec<&'static str>> {
    let mut applied = Vec::new();

    for mapping in ENV_MAPPINGS {
        if lookup(tree, mapping.field_path).is_some() {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = coerce(mapping, raw)?;
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(tree, mapping.field_path, value);
        applied.push(mapping.var_name);
    }

    Ok(applied)
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    match mapping.kind {
        FieldKind::String => Ok(toml::Value::String(raw.to_owned())),
        FieldKind::Integer => raw
            .parse::<u32>()
            .map(|n| toml::Value::Integer(i64::from(n)))
            .map_err(|e| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected a non-negative integer, got '{raw}': {e}"),
            }),
    }
}

fn lookup<'a>(tree: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
    path.split('.').try_fold(tree, |node, segment| node.get(segment))
}

fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), value);
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn empty_tree() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn test_apply_env_fallbacks() {
        let mut tree = empty_tree();
        let env = make_env(&[
            ("CLAUDE_TOOL_APPROVAL_TIMEOUT_MS", "1000"),
            ("AGENTDECK_LOG_LEVEL", "debug"),
        ]);

        let applied = apply_env_fallbacks(&mut tree, &env).unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(tree["approvals"]["timeout_ms"].as_integer(), Some(1000));
        assert_eq!(tree["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_env_fallback_skips_already_set() {
        let mut tree: toml::Value = toml::from_str("[model]\ncontext_window = 200000").unwrap();
        let env = make_env(&[("CONTEXT_WINDOW", "1000")]);

        let applied = apply_env_fallbacks(&mut tree, &env).unwrap();

        assert!(applied.is_empty());
        assert_eq!(tree["model"]["context_window"].as_integer(), Some(200_000));
    }

    #[test]
    fn test_env_fallback_fills_sibling_of_set_field() {
        let mut tree: toml::Value = toml::from_str("[model]\ndefault = \"opus\"").unwrap();
        let env = make_env(&[("CONTEXT_WINDOW", "1000"), ("AGENTDECK_DEFAULT_MODEL", "haiku")]);

        apply_env_fallbacks(&mut tree, &env).unwrap();

        assert_eq!(tree["model"]["default"].as_str(), Some("opus"));
        assert_eq!(tree["model"]["context_window"].as_integer(), Some(1000));
    }

    #[test]
    fn test_bad_integer_is_env_error() {
        let mut tree = empty_tree();
        let env = make_env(&[("CONTEXT_WINDOW", "lots")]);
        let err = apply_env_fallbacks(&mut tree, &env).unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { ref var_name, .. } if var_name == "CONTEXT_WINDOW"));
    }

    #[test]
    fn test_blank_value_ignored() {
        let mut tree = empty_tree();
        let env = make_env(&[("AGENTDECK_CLAUDE_PATH", "  ")]);
        assert!(apply_env_fallbacks(&mut tree, &env).unwrap().is_empty());
        assert!(lookup(&tree, "runtime.executable").is_none());
    }
}
