//! Token usage extraction from `result` messages.

use agentdeck_core::{AgentMessage, TokenBudget};
use serde_json::Value;

/// Counter pairs: cumulative key first, per-call key second.
const COUNTERS: [(&str, &str); 4] = [
    ("cumulativeInputTokens", "inputTokens"),
    ("cumulativeOutputTokens", "outputTokens"),
    ("cumulativeCacheReadInputTokens", "cacheReadInputTokens"),
    ("cumulativeCacheCreationInputTokens", "cacheCreationInputTokens"),
];

/// Usage summary for a `result` message.
///
/// Reads the first model entry of `modelUsage` in the order the runtime wrote
/// it. Returns `None` when the map is missing or empty.
#[must_use]
pub fn extract_token_budget(message: &AgentMessage, context_window: u64) -> Option<TokenBudget> {
    let usage = message
        .get("modelUsage")
        .and_then(Value::as_object)?
        .values()
        .next()?;

    let used = COUNTERS.iter().fold(0_u64, |acc, (cumulative, per_call)| {
        let cumulative = counter(usage, cumulative);
        let value = if cumulative > 0 {
            cumulative
        } else {
            counter(usage, per_call)
        };
        acc.saturating_add(value)
    });

    Some(TokenBudget {
        used,
        total: context_window,
    })
}

fn counter(usage: &Value, key: &str) -> u64 {
    usage.get(key).and_then(Value::as_u64).unwrap_or(0)
}
