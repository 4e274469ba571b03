use serde::{Deserialize, Serialize};

fn default_agent_buffer_timeout() -> f32 {
    2.0
}

/// Agent-mode buffering settings (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Silence time after the last utterance before the buffer flushes.
    #[serde(default = "default_agent_buffer_timeout")]
    pub agent_buffer_timeout: f32,

    /// Shell command template with a literal `$PROMPT` placeholder,
    /// substituted with the buffered text before spawning.
    #[serde(default)]
    pub agent_command_template: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            agent_buffer_timeout: default_agent_buffer_timeout(),
            agent_command_template: String::new(),
        }
    }
}
