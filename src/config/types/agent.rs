//! Agent loop configuration
//!
//! The tunables that govern `agent::agentic_loop`'s bounded reason-act loop.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Agent-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Workspace directory: rendered images, trace log, file tools all live under here
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    /// Filesystem skills directory
    #[serde(default = "default_skills_path")]
    pub skills_path: PathBuf,
    /// Hard cap on reason-act iterations per turn (I-L1)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Soft cap on total tool calls per turn before a budget advisory fires (I-L2)
    #[serde(default = "default_max_tool_calls_per_turn")]
    pub max_tool_calls_per_turn: u32,
    /// Repeat-signature threshold before the one-shot self-check advisory fires (I-L3)
    #[serde(default = "default_loop_review_repeat_threshold")]
    pub loop_review_repeat_threshold: u32,
    /// Character budget for a single sanitized tool result
    #[serde(default = "default_max_tool_result_chars")]
    pub max_tool_result_chars: usize,
    /// Path to the per-turn detailed trace log, relative to `workspace` unless absolute
    #[serde(default = "default_trace_log_path")]
    pub trace_log_path: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            workspace: default_workspace(),
            skills_path: default_skills_path(),
            max_iterations: default_max_iterations(),
            max_tool_calls_per_turn: default_max_tool_calls_per_turn(),
            loop_review_repeat_threshold: default_loop_review_repeat_threshold(),
            max_tool_result_chars: default_max_tool_result_chars(),
            trace_log_path: default_trace_log_path(),
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from("./workspace")
}

fn default_skills_path() -> PathBuf {
    PathBuf::from("./skills")
}

fn default_max_iterations() -> u32 {
    20
}

fn default_max_tool_calls_per_turn() -> u32 {
    14
}

fn default_loop_review_repeat_threshold() -> u32 {
    3
}

fn default_max_tool_result_chars() -> usize {
    40_000
}

fn default_trace_log_path() -> PathBuf {
    PathBuf::from("work_log_detailed.md")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.max_tool_calls_per_turn, 14);
        assert_eq!(config.loop_review_repeat_threshold, 3);
        assert_eq!(config.max_tool_result_chars, 40_000);
    }
}
