//! Runner configuration (spec §9 ambient stack: `tooling::config::ConfigBuilder`
//! conventions applied to runner/worker/plugin-manager structs).

use std::time::Duration;
use tooling::config::{get_env_bool, get_env_parse_or, ConfigBuilder};
use tooling::{Result as ToolingResult, ToolingError};

/// Tunables for one [`crate::Runner`] instance.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Capacity of the outer event channel a turn streams into.
    pub channel_capacity: usize,
    /// Deadline `EventSink::emit` races against; zero means "block until
    /// accepted or cancelled" (spec §4.1).
    pub emit_timeout: Duration,
    /// Whether a terminal auto-memory job is enqueued at the end of a turn.
    pub auto_memory_enabled: bool,
    /// Whether each turn's events are additionally mapped to the AG-UI wire
    /// sequence (spec §6.5); the translator is purely additive and never
    /// gates persistence.
    pub translate_for_external_consumers: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            emit_timeout: Duration::ZERO,
            auto_memory_enabled: false,
            translate_for_external_consumers: false,
        }
    }
}

impl ConfigBuilder for RunnerConfig {
    fn validate(&self) -> ToolingResult<()> {
        if self.channel_capacity == 0 {
            return Err(ToolingError::General(
                "channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> ToolingResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            channel_capacity: get_env_parse_or(
                &format!("{prefix}CHANNEL_CAPACITY"),
                defaults.channel_capacity,
            )?,
            emit_timeout: Duration::from_millis(get_env_parse_or(
                &format!("{prefix}EMIT_TIMEOUT_MS"),
                defaults.emit_timeout.as_millis() as u64,
            )?),
            auto_memory_enabled: get_env_bool(&format!("{prefix}AUTO_MEMORY_ENABLED"))?
                .unwrap_or(defaults.auto_memory_enabled),
            translate_for_external_consumers: get_env_bool(&format!(
                "{prefix}TRANSLATE_FOR_EXTERNAL_CONSUMERS"
            ))?
            .unwrap_or(defaults.translate_for_external_consumers),
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        self.channel_capacity = other.channel_capacity;
        self.emit_timeout = other.emit_timeout;
        self.auto_memory_enabled = other.auto_memory_enabled;
        self.translate_for_external_consumers = other.translate_for_external_consumers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RunnerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_channel_capacity_is_rejected() {
        let mut config = RunnerConfig::default();
        config.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
