//! Repeat-signature loop guard (I-L3).
//!
//! Detects when the model keeps invoking the same tool with the same
//! arguments and surfaces a one-shot advisory instructing it to
//! self-check for genuine new evidence, rather than retrying blindly.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

/// Build the canonical signature `"<name>:<sorted-key-json(args)>"` used
/// both by the loop guard and the per-turn tool cache (I-L4).
pub fn canonical_signature(tool_name: &str, args: &Value) -> String {
    format!("{}:{}", tool_name, canonicalize(args))
}

/// Recursively re-serialize a `Value` with object keys sorted, so that two
/// semantically-equal argument sets always produce the same string.
fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", serde_json::to_string(k).unwrap(), canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Outcome of recording a tool-call signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatOutcome {
    /// Number of times this signature has now been seen this turn
    pub count: u32,
    /// Whether this is the first time the threshold has been crossed for
    /// this signature (the advisory fires exactly once per signature)
    pub should_warn: bool,
}

/// Counts tool-call signatures within a single turn and fires a one-shot
/// advisory when a signature crosses the repeat threshold.
#[derive(Debug)]
pub struct LoopGuard {
    counts: HashMap<String, u32>,
    warned: HashSet<String>,
    threshold: u32,
}

impl LoopGuard {
    /// Create a new guard with the given repeat threshold
    /// (`LOOP_REVIEW_REPEAT_THRESHOLD`, default 3).
    pub fn new(threshold: u32) -> Self {
        LoopGuard {
            counts: HashMap::new(),
            warned: HashSet::new(),
            threshold,
        }
    }

    /// Record an occurrence of `signature`, returning the updated count and
    /// whether the one-shot advisory should fire now.
    pub fn record(&mut self, signature: &str) -> RepeatOutcome {
        let count = self.counts.entry(signature.to_string()).or_insert(0);
        *count += 1;
        let count = *count;

        let should_warn = count >= self.threshold && self.warned.insert(signature.to_string());

        RepeatOutcome { count, should_warn }
    }

    /// Current count for a signature without mutating state.
    pub fn count_for(&self, signature: &str) -> u32 {
        self.counts.get(signature).copied().unwrap_or(0)
    }
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_signature_is_key_order_independent() {
        let a = canonical_signature("inspect_region", &json!({"x": 1, "y": 2}));
        let b = canonical_signature("inspect_region", &json!({"y": 2, "x": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn warns_exactly_once_per_signature_at_threshold() {
        let mut guard = LoopGuard::new(3);
        let sig = "inspect_region:{}";
        assert!(!guard.record(sig).should_warn);
        assert!(!guard.record(sig).should_warn);
        let third = guard.record(sig);
        assert!(third.should_warn);
        assert_eq!(third.count, 3);
        // Further repeats keep incrementing but never warn again.
        assert!(!guard.record(sig).should_warn);
        assert!(!guard.record(sig).should_warn);
    }

    #[test]
    fn distinct_signatures_are_tracked_independently() {
        let mut guard = LoopGuard::new(2);
        assert!(!guard.record("a:{}").should_warn);
        assert!(!guard.record("b:{}").should_warn);
        assert!(guard.record("a:{}").should_warn);
    }
}
