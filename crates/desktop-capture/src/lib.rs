//! # Desktop Capture
//! Captures a display output through desktop duplication, downscales it on the GPU, and decodes it
//! into packed RGB frames for ambient lighting controllers.
//!

extern crate alloc;

pub use adapters::{AdapterInfo, AdapterListing, OutputInfo, string_from_wide};
pub use backend::{AcquireOutcome, CaptureBackend, FrameInfo};
pub use config::{CaptureConfig, ConfigError};
pub use decode::{DecodeError, FrameBuffer, FrameDecoder, MappedFrame};
pub use format::{NegotiatedFormat, PixelFormat, UnsupportedFormat};
pub use layout::CaptureLayout;
pub use limiter::FrameRateLimiter;
pub use session::{CaptureError, CaptureOutcome, CaptureSession, InitError, SessionState};

#[cfg(windows)]
pub use dxgi::{DxgiBackend, DxgiCaptureSession, list_adapters};
#[cfg(windows)]
pub use result::{LabelledWinResult, WinError};

mod adapters;
mod backend;
mod config;
pub mod decode;
mod format;
mod layout;
mod limiter;
mod session;

#[cfg(windows)]
mod dxgi;
#[cfg(windows)]
mod result;
