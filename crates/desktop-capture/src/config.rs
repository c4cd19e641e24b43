use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration of a single capture session.
///
/// A session is bound to exactly one adapter/output pair for its lifetime, the configuration is
/// validated once by [`CaptureSession::initialize`](crate::CaptureSession::initialize).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Index of the DXGI adapter that owns the output.
    pub adapter_index: u32,

    /// Index of the output (monitor) on the adapter.
    pub monitor_index: u32,

    /// Divisor applied to the desktop size, must be `1` or a power of two.
    pub scaling_factor: u32,

    /// Upper bound on captures per second.
    pub max_fps: u32,

    /// How long a single frame acquisition may block.
    pub frame_capture_timeout_ms: u32,
}

impl CaptureConfig {
    /// Checks the configuration, returning the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scaling_factor.is_power_of_two() {
            return Err(ConfigError::InvalidScalingFactor(self.scaling_factor));
        }

        if self.max_fps == 0 {
            return Err(ConfigError::InvalidMaxFps(self.max_fps));
        }

        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            monitor_index: 0,
            scaling_factor: 8,
            max_fps: 30,
            frame_capture_timeout_ms: 100,
        }
    }
}

/// A capture configuration that can never produce a working session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The scaling factor is not `1` or a power of two.
    #[error("Invalid scaling factor {0}, allowed values are 1, 2, 4, 8, etc.")]
    InvalidScalingFactor(u32),

    /// The maximum frame rate is zero.
    #[error("Invalid maximum frame rate {0}, must be at least 1")]
    InvalidMaxFps(u32),
}
