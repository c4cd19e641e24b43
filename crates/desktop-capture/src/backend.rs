use crate::{CaptureConfig, CaptureLayout, MappedFrame, NegotiatedFormat};

/// Result of waiting for the next duplicated frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// No frame became available within the timeout.
    Timeout,

    /// The duplication is no longer valid and must be reopened.
    AccessLost,

    /// A frame was acquired and is held until [`CaptureBackend::release_frame`].
    Frame(FrameInfo),
}

/// Metadata of an acquired frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameInfo {
    /// Time of the last desktop present, `0` when only metadata changed.
    pub last_present_time: i64,
}

impl FrameInfo {
    /// If the frame carries new pixel content.
    pub fn has_new_content(&self) -> bool {
        self.last_present_time != 0
    }
}

/// The GPU side of a capture session.
///
/// A backend owns every GPU resource of one adapter/output pair. [`CaptureSession`] drives it
/// through the capture state machine and never touches the resources directly.
///
/// [`CaptureSession`]: crate::CaptureSession
pub trait CaptureBackend: Sized {
    /// Error returned by the underlying API.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Opens the device and output selected by `config`.
    fn open(config: &CaptureConfig) -> Result<Self, Self::Error>;

    /// Queries the current desktop size of the output.
    fn desktop_size(&mut self) -> Result<[u32; 2], Self::Error>;

    /// Opens the duplication and (re)creates the staging and downscale textures for `layout`.
    ///
    /// Returns the format the duplication was negotiated into.
    fn open_duplication(&mut self, layout: &CaptureLayout) -> Result<NegotiatedFormat, Self::Error>;

    /// Releases the duplication handle.
    fn release_duplication(&mut self) -> Result<(), Self::Error>;

    /// Waits up to `timeout_ms` for the next frame.
    fn acquire_frame(&mut self, timeout_ms: u32) -> Result<AcquireOutcome, Self::Error>;

    /// Copies the acquired frame into the staging texture, downscaling it when
    /// [`CaptureLayout::is_scaled`].
    fn copy_to_staging(&mut self, layout: &CaptureLayout) -> Result<(), Self::Error>;

    /// Maps the staging texture for CPU reads.
    fn map_staging(&mut self) -> Result<MappedFrame<'_>, Self::Error>;

    /// Drops the backend's reference to the acquired frame resource.
    fn drop_frame_resource(&mut self);

    /// Unmaps the staging texture.
    fn unmap_staging(&mut self) -> Result<(), Self::Error>;

    /// Returns the acquired frame to the duplication.
    fn release_frame(&mut self) -> Result<(), Self::Error>;
}
