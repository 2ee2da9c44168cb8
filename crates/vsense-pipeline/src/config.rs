//! Pipeline configuration.

use std::time::Duration;

/// Stage pacing and orchestration knobs.
///
/// The paced stages exist to yield control and give the client smooth
/// progress feedback; their durations are cosmetic and safe to zero out.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sub-steps per paced stage
    pub stage_steps: u32,
    /// Duration of the validation stage (0-20%)
    pub validation_duration: Duration,
    /// Settle delay after the metadata probe
    pub metadata_settle_delay: Duration,
    /// Duration of the simulated moderation advance for local-only assets
    pub moderation_sim_duration: Duration,
    /// Duration of the fallback advance after an absorbed moderation error
    pub moderation_fallback_duration: Duration,
    /// Duration of the reporting stage (80-95%)
    pub reporting_duration: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_steps: 5,
            validation_duration: Duration::from_millis(1500),
            metadata_settle_delay: Duration::from_millis(1500),
            moderation_sim_duration: Duration::from_millis(3000),
            moderation_fallback_duration: Duration::from_millis(2000),
            reporting_duration: Duration::from_millis(1000),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables, defaults applied per
    /// field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stage_steps: env_u32("PIPELINE_STAGE_STEPS").unwrap_or(defaults.stage_steps),
            validation_duration: env_ms("PIPELINE_VALIDATION_MS")
                .unwrap_or(defaults.validation_duration),
            metadata_settle_delay: env_ms("PIPELINE_METADATA_SETTLE_MS")
                .unwrap_or(defaults.metadata_settle_delay),
            moderation_sim_duration: env_ms("PIPELINE_MODERATION_SIM_MS")
                .unwrap_or(defaults.moderation_sim_duration),
            moderation_fallback_duration: env_ms("PIPELINE_MODERATION_FALLBACK_MS")
                .unwrap_or(defaults.moderation_fallback_duration),
            reporting_duration: env_ms("PIPELINE_REPORTING_MS")
                .unwrap_or(defaults.reporting_duration),
        }
    }

    /// Zero-delay pacing for tests.
    pub fn instant() -> Self {
        Self {
            stage_steps: 5,
            validation_duration: Duration::ZERO,
            metadata_settle_delay: Duration::ZERO,
            moderation_sim_duration: Duration::ZERO,
            moderation_fallback_duration: Duration::ZERO,
            reporting_duration: Duration::ZERO,
        }
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_ms(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.stage_steps, 5);
        assert_eq!(config.validation_duration, Duration::from_millis(1500));
        assert_eq!(config.reporting_duration, Duration::from_millis(1000));
    }

    #[test]
    fn test_instant_has_no_delays() {
        let config = PipelineConfig::instant();
        assert_eq!(config.validation_duration, Duration::ZERO);
        assert_eq!(config.moderation_sim_duration, Duration::ZERO);
    }
}
