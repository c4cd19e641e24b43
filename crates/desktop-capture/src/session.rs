use alloc::sync::Arc;
use core::{fmt::Display, time::Duration};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::{
    AcquireOutcome, CaptureBackend, CaptureConfig, CaptureLayout, ConfigError, DecodeError,
    FrameBuffer, FrameDecoder, FrameRateLimiter, NegotiatedFormat, UnsupportedFormat,
};

/// Lifecycle state of a [`CaptureSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, [`CaptureSession::initialize`] has not succeeded yet.
    Uninitialized,

    /// The duplication is usable.
    Ready,

    /// The duplication was lost, the next capture reopens it.
    Invalid,

    /// All resources were released, terminal.
    Disposed,
}

/// The result of a single [`CaptureSession::capture`].
#[derive(Clone, Debug)]
pub enum CaptureOutcome {
    /// A newly decoded frame.
    Fresh(FrameBuffer),

    /// No new content, the previous frame is handed back unchanged and is safe to resend.
    Retained(FrameBuffer),

    /// Nothing to send this tick.
    Absent,
}

impl CaptureOutcome {
    /// The frame carried by this outcome, if any.
    pub fn frame(&self) -> Option<&FrameBuffer> {
        match self {
            Self::Fresh(frame) | Self::Retained(frame) => Some(frame),
            Self::Absent => None,
        }
    }

    /// If this outcome carries a newly decoded frame.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Resources that only exist between initialization and disposal.
struct ActiveSession<B> {
    backend: B,
    layout: CaptureLayout,
    decoder: FrameDecoder,
    format: NegotiatedFormat,
}

/// What happened between acquiring a frame and cleanup.
enum FrameResult {
    Decoded(FrameBuffer),
    Timeout,
    Unchanged,
    AccessLost,
}

/// Captures one display output into packed RGB frames at a bounded rate.
///
/// The session is single threaded, the caller owns the capture loop:
/// ```ignore
/// let mut session = CaptureSession::<DxgiBackend>::new(config);
/// session.initialize()?;
/// loop {
///     match session.capture()? { /* ... */ }
///     session.delay_next_capture();
/// }
/// ```
pub struct CaptureSession<B: CaptureBackend> {
    config: CaptureConfig,
    limiter: FrameRateLimiter,
    state: SessionState,
    active: Option<ActiveSession<B>>,
    last_frame: Option<FrameBuffer>,
    last_capture_duration: Duration,
}

impl<B: CaptureBackend> CaptureSession<B> {
    /// Creates an uninitialized session, no resources are acquired until
    /// [`CaptureSession::initialize`].
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            limiter: FrameRateLimiter::new(config.max_fps),
            state: SessionState::Uninitialized,
            active: None,
            last_frame: None,
            last_capture_duration: Duration::ZERO,
        }
    }

    /// Validates the configuration, opens the device and output, and starts duplicating the
    /// output.
    pub fn initialize(&mut self) -> Result<(), InitError<B::Error>> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Disposed => return Err(InitError::Disposed),
            SessionState::Ready | SessionState::Invalid => {
                return Err(InitError::AlreadyInitialized);
            }
        }

        self.config.validate()?;

        let mut backend = B::open(&self.config).map_err(InitError::Backend)?;
        let native_size = backend.desktop_size().map_err(InitError::Backend)?;
        let layout = CaptureLayout::from_config(native_size, &self.config)?;
        let format = backend
            .open_duplication(&layout)
            .map_err(InitError::Backend)?;

        info!(
            "Capture session ready {{ native: {:?}, capture: {:?}, mip_levels: {}, format: {:?} }}",
            layout.native_size, layout.capture_size, layout.mip_levels, format
        );

        self.active = Some(ActiveSession {
            backend,
            layout,
            decoder: FrameDecoder::new(layout.capture_size),
            format,
        });
        self.state = SessionState::Ready;

        Ok(())
    }

    /// Captures the next frame.
    ///
    /// Timeouts and frames without new content return the retained frame, or
    /// [`CaptureOutcome::Absent`] before the first decode. A lost duplication returns
    /// [`CaptureOutcome::Absent`] and is reopened by the next call.
    pub fn capture(&mut self) -> Result<CaptureOutcome, CaptureError<B::Error>> {
        match self.state {
            SessionState::Uninitialized => return Err(CaptureError::NotInitialized),
            SessionState::Disposed => return Err(CaptureError::Disposed),
            SessionState::Invalid => self.reopen_duplication()?,
            SessionState::Ready => {}
        }

        let timeout_ms = self.config.frame_capture_timeout_ms;
        let has_retained = self.last_frame.is_some();
        let active = self.active.as_mut().ok_or(CaptureError::NotInitialized)?;

        let start = Instant::now();
        let result = Self::capture_frame(active, timeout_ms, has_retained);
        Self::cleanup(&mut active.backend);
        self.last_capture_duration = start.elapsed();

        match result? {
            FrameResult::Decoded(frame) => {
                self.last_frame = Some(Arc::clone(&frame));
                Ok(CaptureOutcome::Fresh(frame))
            }

            FrameResult::Timeout | FrameResult::Unchanged => Ok(self.retained_or_absent()),

            FrameResult::AccessLost => {
                warn!("Duplication access lost, it will be reopened on the next capture");
                self.state = SessionState::Invalid;
                Ok(CaptureOutcome::Absent)
            }
        }
    }

    /// Blocks for the remainder of the frame interval, measured against the duration of the last
    /// [`CaptureSession::capture`].
    pub fn delay_next_capture(&self) {
        self.limiter.delay(self.last_capture_duration);
    }

    /// Releases every GPU resource and the retained frame. Calling this more than once does
    /// nothing.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }

        if let Some(mut active) = self.active.take() {
            release_best_effort(active.backend.release_duplication(), "release duplication");
            // The backend releases the rest of its resources in reverse acquisition order.
            drop(active);
        }

        self.last_frame = None;
        self.state = SessionState::Disposed;
        debug!("Capture session disposed");
    }

    /// If [`CaptureSession::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.state == SessionState::Disposed
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The session's configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The texture layout, available once initialized.
    pub fn layout(&self) -> Option<&CaptureLayout> {
        self.active.as_ref().map(|active| &active.layout)
    }

    /// The size of decoded frames, available once initialized.
    pub fn capture_size(&self) -> Option<[u32; 2]> {
        self.layout().map(|layout| layout.capture_size)
    }

    /// The format negotiated by the current duplication.
    pub fn negotiated_format(&self) -> Option<NegotiatedFormat> {
        self.active.as_ref().map(|active| active.format)
    }

    /// The last successfully decoded frame.
    pub fn last_frame(&self) -> Option<&FrameBuffer> {
        self.last_frame.as_ref()
    }

    /// How long the last [`CaptureSession::capture`] took.
    pub fn last_capture_duration(&self) -> Duration {
        self.last_capture_duration
    }

    /// Reopens a lost duplication against the existing device and output.
    fn reopen_duplication(&mut self) -> Result<(), CaptureError<B::Error>> {
        let active = self.active.as_mut().ok_or(CaptureError::NotInitialized)?;

        release_best_effort(
            active.backend.release_duplication(),
            "release stale duplication",
        );

        // The desktop may have changed size with the mode switch that invalidated the
        // duplication.
        let native_size = active
            .backend
            .desktop_size()
            .map_err(CaptureError::Reinitialize)?;
        let layout = CaptureLayout::from_config(native_size, &self.config)?;

        let format = active
            .backend
            .open_duplication(&layout)
            .map_err(CaptureError::Reinitialize)?;

        if layout != active.layout {
            info!(
                "Desktop resized {:?} -> {:?}, capturing at {:?}",
                active.layout.native_size, layout.native_size, layout.capture_size
            );

            active.layout = layout;
            active.decoder = FrameDecoder::new(layout.capture_size);
            self.last_frame = None;
        }

        if format != active.format {
            debug!("Duplication format changed {:?} -> {:?}", active.format, format);
        }

        active.format = format;
        self.state = SessionState::Ready;
        info!("Duplication reopened");

        Ok(())
    }

    /// Acquires, copies, maps, and decodes one frame. Cleanup is left to the caller.
    fn capture_frame(
        active: &mut ActiveSession<B>,
        timeout_ms: u32,
        has_retained: bool,
    ) -> Result<FrameResult, CaptureError<B::Error>> {
        let info = match active
            .backend
            .acquire_frame(timeout_ms)
            .map_err(CaptureError::Acquire)?
        {
            AcquireOutcome::Timeout => return Ok(FrameResult::Timeout),
            AcquireOutcome::AccessLost => return Ok(FrameResult::AccessLost),
            AcquireOutcome::Frame(info) => info,
        };

        if !info.has_new_content() && has_retained {
            return Ok(FrameResult::Unchanged);
        }

        active
            .backend
            .copy_to_staging(&active.layout)
            .map_err(CaptureError::Copy)?;

        let mapped = active.backend.map_staging().map_err(CaptureError::Map)?;
        let format = active.format?;
        let frame = active.decoder.decode(&mapped, format)?;

        Ok(FrameResult::Decoded(frame))
    }

    /// Releases the frame resources after every acquisition attempt.
    fn cleanup(backend: &mut B) {
        backend.drop_frame_resource();
        // Some drivers report out of memory here after a valid capture.
        release_best_effort(backend.unmap_staging(), "unmap staging texture");
        // Invalid call or access lost, the capture has already completed or failed.
        release_best_effort(backend.release_frame(), "release frame");
    }

    fn retained_or_absent(&self) -> CaptureOutcome {
        match &self.last_frame {
            Some(frame) => CaptureOutcome::Retained(Arc::clone(frame)),
            None => CaptureOutcome::Absent,
        }
    }
}

impl<B: CaptureBackend> Drop for CaptureSession<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Runs a release step whose failure carries no information.
///
/// Failures are logged at trace level and never returned.
fn release_best_effort<E: Display>(result: Result<(), E>, step: &'static str) {
    if let Err(error) = result {
        trace!("Ignoring {step} failure: {error}");
    }
}

/// Errors that prevent a session from starting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InitError<E> {
    /// The configuration can never produce a working session.
    #[error("Invalid capture configuration:\n{0}")]
    InvalidConfig(#[from] ConfigError),

    /// The session was already initialized.
    #[error("The capture session is already initialized")]
    AlreadyInitialized,

    /// The session was disposed.
    #[error("The capture session has been disposed")]
    Disposed,

    /// The device, output, or duplication could not be created.
    #[error("Failed to set up the capture device:\n{0}")]
    Backend(#[source] E),
}

/// Errors surfaced by [`CaptureSession::capture`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError<E> {
    /// [`CaptureSession::initialize`] has not succeeded.
    #[error("The capture session is not initialized")]
    NotInitialized,

    /// The session was disposed.
    #[error("The capture session has been disposed")]
    Disposed,

    /// The desktop size read on reopen is unusable with the scaling factor.
    #[error("Invalid capture layout:\n{0}")]
    Layout(#[from] ConfigError),

    /// A lost duplication could not be reopened.
    #[error("Failed to reopen the duplication:\n{0}")]
    Reinitialize(#[source] E),

    /// Acquiring the next frame failed with something other than a timeout or lost access.
    #[error("Failed to acquire the next frame:\n{0}")]
    Acquire(#[source] E),

    /// Copying the frame into the staging texture failed.
    #[error("Failed to copy the frame to the staging texture:\n{0}")]
    Copy(#[source] E),

    /// Mapping the staging texture failed.
    #[error("Failed to map the staging texture:\n{0}")]
    Map(#[source] E),

    /// The negotiated format has no decode path.
    #[error("Failed to decode the frame:\n{0}")]
    UnsupportedPixelFormat(#[from] UnsupportedFormat),

    /// The mapped memory does not fit the frame size.
    #[error("Failed to decode the frame:\n{0}")]
    Decode(#[from] DecodeError),
}

impl<E> CaptureError<E> {
    /// If a later [`CaptureSession::capture`] may succeed without changing the configuration.
    ///
    /// The duplication can be refused for as long as the secure desktop is shown, the session
    /// stays [`SessionState::Invalid`] and retries the reopen on every call.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Reinitialize(_) | Self::Acquire(_) | Self::Copy(_) | Self::Map(_) => true,

            Self::NotInitialized
            | Self::Disposed
            | Self::Layout(_)
            | Self::UnsupportedPixelFormat(_)
            | Self::Decode(_) => false,
        }
    }
}
