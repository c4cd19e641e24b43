use crate::{CaptureConfig, ConfigError};

/// The sizes and mip selection shared by the staging and downscale textures.
///
/// Computed once per session from the desktop size and the scaling factor, reused whenever the
/// duplication is reopened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureLayout {
    /// The desktop size of the output in pixels.
    pub native_size: [u32; 2],

    /// The size of the decoded frame in pixels.
    pub capture_size: [u32; 2],

    /// Number of mip levels of the downscale texture.
    pub mip_levels: u32,

    /// The mip level copied into the staging texture, `log2(scaling_factor)`.
    pub mip_slice: u32,
}

impl CaptureLayout {
    /// Creates the layout for an output of `native_size` with the given scaling factor.
    ///
    /// Non-divisible sizes truncate.
    pub fn new(native_size: [u32; 2], scaling_factor: u32) -> Result<Self, ConfigError> {
        if !scaling_factor.is_power_of_two() {
            return Err(ConfigError::InvalidScalingFactor(scaling_factor));
        }

        let mip_slice = scaling_factor.trailing_zeros();
        let mip_levels = if scaling_factor == 1 {
            1
        } else {
            2 + mip_slice - 1
        };

        let capture_size = [
            native_size[0] / scaling_factor,
            native_size[1] / scaling_factor,
        ];

        Ok(Self {
            native_size,
            capture_size,
            mip_levels,
            mip_slice,
        })
    }

    /// Creates the layout for an output of `native_size` using the config's scaling factor.
    pub fn from_config(native_size: [u32; 2], config: &CaptureConfig) -> Result<Self, ConfigError> {
        Self::new(native_size, config.scaling_factor)
    }

    /// If frames go through the GPU downscale path.
    pub fn is_scaled(&self) -> bool {
        self.capture_size != self.native_size
    }

    /// Length in bytes of a decoded frame.
    pub fn frame_len(&self) -> usize {
        self.capture_size[0] as usize * self.capture_size[1] as usize * 3
    }
}
