//! Playback configuration

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for playback engines and the hub
///
/// Every field has a default so partial config files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Look-ahead tracks to preload beyond the current one (default: 2)
    #[serde(default = "default_preload_limit")]
    pub preload_limit: usize,

    /// Length of a play/pause volume fade (default: 300ms)
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,

    /// Discrete volume steps per fade (default: 10)
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,

    /// Volume a fade-in ends at, 0.0-1.0 (default: 1.0)
    #[serde(default = "default_target_volume")]
    pub target_volume: f32,

    /// Loads per track before the failure is terminal (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry backoff unit; attempt `n` waits `n` units (default: 1000ms)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Forward buffer on Wi-Fi (default: 60s)
    #[serde(default = "default_wifi_buffer_secs")]
    pub wifi_buffer_secs: u64,

    /// Forward buffer on cellular or unknown paths (default: 30s)
    #[serde(default = "default_constrained_buffer_secs")]
    pub constrained_buffer_secs: u64,

    /// Initial range for files that hold a whole set (default: 512000)
    #[serde(default = "default_large_file_initial_range_bytes")]
    pub large_file_initial_range_bytes: u64,

    /// Progress tick period (default: 500ms)
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Recently played shows kept by the history book (default: 50)
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Retry terminally failed tracks when the network comes back (default: true)
    #[serde(default = "default_retry_on_reconnect")]
    pub retry_on_reconnect: bool,
}

fn default_preload_limit() -> usize {
    2
}

fn default_fade_duration_ms() -> u64 {
    300
}

fn default_fade_steps() -> u32 {
    10
}

fn default_target_volume() -> f32 {
    1.0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_wifi_buffer_secs() -> u64 {
    60
}

fn default_constrained_buffer_secs() -> u64 {
    30
}

fn default_large_file_initial_range_bytes() -> u64 {
    512_000
}

fn default_progress_interval_ms() -> u64 {
    500
}

fn default_history_size() -> usize {
    50
}

fn default_retry_on_reconnect() -> bool {
    true
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            preload_limit: default_preload_limit(),
            fade_duration_ms: default_fade_duration_ms(),
            fade_steps: default_fade_steps(),
            target_volume: default_target_volume(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            wifi_buffer_secs: default_wifi_buffer_secs(),
            constrained_buffer_secs: default_constrained_buffer_secs(),
            large_file_initial_range_bytes: default_large_file_initial_range_bytes(),
            progress_interval_ms: default_progress_interval_ms(),
            history_size: default_history_size(),
            retry_on_reconnect: default_retry_on_reconnect(),
        }
    }
}

impl PlaybackConfig {
    /// Reject values the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.fade_steps == 0 {
            return Err(PlaybackError::invalid_config("fade_steps must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(PlaybackError::invalid_config("max_attempts must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.target_volume) {
            return Err(PlaybackError::invalid_config(format!(
                "target_volume must be within 0.0-1.0, got {}",
                self.target_volume
            )));
        }
        if self.progress_interval_ms == 0 {
            return Err(PlaybackError::invalid_config(
                "progress_interval_ms must be positive",
            ));
        }
        if self.large_file_initial_range_bytes == 0 {
            return Err(PlaybackError::invalid_config(
                "large_file_initial_range_bytes must be positive",
            ));
        }
        Ok(())
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    /// Delay between two fade steps
    pub fn fade_step_interval(&self) -> Duration {
        self.fade_duration() / self.fade_steps.max(1)
    }

    /// Backoff before reload number `attempt + 1` (linear)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(u64::from(attempt)))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn wifi_buffer(&self) -> Duration {
        Duration::from_secs(self.wifi_buffer_secs)
    }

    pub fn constrained_buffer(&self) -> Duration {
        Duration::from_secs(self.constrained_buffer_secs)
    }
}
