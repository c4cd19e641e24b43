//! Scripted capture backend for exercising sessions without a GPU.
//!

#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use desktop_capture::{
    AcquireOutcome, CaptureBackend, CaptureConfig, CaptureLayout, CaptureSession, FrameInfo,
    MappedFrame, NegotiatedFormat, PixelFormat,
};
use thiserror::Error;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt};

pub fn init_logger() {
    let filter = tracing_subscriber::filter::Targets::new().with_default(LevelFilter::TRACE);

    let std_logger = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .with_test_writer();

    let collector = tracing_subscriber::registry().with(std_logger).with(filter);

    // Every test in a binary calls this, only the first one wins.
    let _ = set_global_default(collector);
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Fake backend failure: {0}")]
pub struct FakeError(pub &'static str);

/// What the fake backend does and what has been called on it.
#[derive(Debug)]
pub struct FakeState {
    pub desktop_size: [u32; 2],
    pub format: NegotiatedFormat,
    pub row_padding: usize,
    /// Bytes of the native pixel every copy writes, [`bgra_for_copy`] when unset.
    pub pixel: Option<Vec<u8>>,
    pub outcomes: VecDeque<Result<AcquireOutcome, FakeError>>,

    pub fail_open: bool,
    pub fail_open_duplication: bool,
    pub fail_map: bool,

    pub opens: usize,
    pub duplications_opened: usize,
    pub duplications_released: usize,
    pub acquires: usize,
    pub copies: usize,
    pub maps: usize,
    pub unmaps: usize,
    pub frames_released: usize,
    pub resources_dropped: usize,
    pub last_copy_layout: Option<CaptureLayout>,

    pub frame_held: bool,
    pub staging_mapped: bool,
}

impl FakeState {
    pub fn new(desktop_size: [u32; 2], format: NegotiatedFormat) -> Self {
        Self {
            desktop_size,
            format,
            row_padding: 0,
            pixel: None,
            outcomes: VecDeque::new(),
            fail_open: false,
            fail_open_duplication: false,
            fail_map: false,
            opens: 0,
            duplications_opened: 0,
            duplications_released: 0,
            acquires: 0,
            copies: 0,
            maps: 0,
            unmaps: 0,
            frames_released: 0,
            resources_dropped: 0,
            last_copy_layout: None,
            frame_held: false,
            staging_mapped: false,
        }
    }

    /// Queues a frame with new content.
    pub fn push_frame(&mut self) {
        self.outcomes
            .push_back(Ok(AcquireOutcome::Frame(FrameInfo { last_present_time: 1 })));
    }

    /// Queues a frame that only carries pointer or metadata updates.
    pub fn push_unchanged(&mut self) {
        self.outcomes
            .push_back(Ok(AcquireOutcome::Frame(FrameInfo { last_present_time: 0 })));
    }

    pub fn push(&mut self, outcome: AcquireOutcome) {
        self.outcomes.push_back(Ok(outcome));
    }
}

thread_local! {
    static NEXT_STATE: RefCell<Option<Rc<RefCell<FakeState>>>> = const { RefCell::new(None) };
}

/// Installs `state` for the next [`FakeBackend::open`] on this thread.
pub fn install(state: FakeState) -> Rc<RefCell<FakeState>> {
    let state = Rc::new(RefCell::new(state));
    NEXT_STATE.with_borrow_mut(|next| *next = Some(Rc::clone(&state)));
    state
}

/// Creates an initialized session over a fake `desktop_size` output.
pub fn ready_session(
    config: CaptureConfig,
    state: FakeState,
) -> (CaptureSession<FakeBackend>, Rc<RefCell<FakeState>>) {
    init_logger();

    let state = install(state);
    let mut session = CaptureSession::<FakeBackend>::new(config);
    session.initialize().unwrap();

    (session, state)
}

/// The BGRA pixel written by the `n`th copy.
pub fn bgra_for_copy(n: usize) -> [u8; 4] {
    let n = n as u8;
    [n, n.wrapping_add(1), n.wrapping_add(2), 255]
}

/// The RGB pixel decoded from the `n`th copy.
pub fn rgb_for_copy(n: usize) -> [u8; 3] {
    let [b, g, r, _] = bgra_for_copy(n);
    [r, g, b]
}

pub struct FakeBackend {
    state: Rc<RefCell<FakeState>>,
    staging: Vec<u8>,
    row_pitch: usize,
}

impl CaptureBackend for FakeBackend {
    type Error = FakeError;

    fn open(_config: &CaptureConfig) -> Result<Self, Self::Error> {
        let state = NEXT_STATE
            .with_borrow_mut(Option::take)
            .ok_or(FakeError("no state installed"))?;

        {
            let mut state = state.borrow_mut();
            if state.fail_open {
                return Err(FakeError("open"));
            }
            state.opens += 1;
        }

        Ok(Self {
            state,
            staging: Vec::new(),
            row_pitch: 0,
        })
    }

    fn desktop_size(&mut self) -> Result<[u32; 2], Self::Error> {
        Ok(self.state.borrow().desktop_size)
    }

    fn open_duplication(&mut self, layout: &CaptureLayout) -> Result<NegotiatedFormat, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_open_duplication {
            return Err(FakeError("open duplication"));
        }
        state.duplications_opened += 1;

        let bytes_per_pixel = state.format.map_or(4, PixelFormat::bytes_per_pixel);
        self.row_pitch = layout.capture_size[0] as usize * bytes_per_pixel + state.row_padding;
        self.staging = vec![0; self.row_pitch * layout.capture_size[1] as usize];

        Ok(state.format)
    }

    fn release_duplication(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().duplications_released += 1;
        Ok(())
    }

    fn acquire_frame(&mut self, _timeout_ms: u32) -> Result<AcquireOutcome, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.acquires += 1;

        let outcome = state
            .outcomes
            .pop_front()
            .unwrap_or(Ok(AcquireOutcome::Timeout))?;

        if let AcquireOutcome::Frame(_) = outcome {
            state.frame_held = true;
        }

        Ok(outcome)
    }

    fn copy_to_staging(&mut self, layout: &CaptureLayout) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        assert!(state.frame_held, "copy without an acquired frame");

        state.copies += 1;
        state.last_copy_layout = Some(*layout);

        let pixel = match &state.pixel {
            Some(pixel) => pixel.clone(),
            None => bgra_for_copy(state.copies).to_vec(),
        };
        let row_len = layout.capture_size[0] as usize * pixel.len();
        for row in self.staging.chunks_exact_mut(self.row_pitch) {
            for target in row[..row_len].chunks_exact_mut(pixel.len()) {
                target.copy_from_slice(&pixel);
            }
        }

        Ok(())
    }

    fn map_staging(&mut self) -> Result<MappedFrame<'_>, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_map {
            return Err(FakeError("map"));
        }
        state.maps += 1;
        state.staging_mapped = true;

        Ok(MappedFrame {
            data: &self.staging,
            row_pitch: self.row_pitch,
        })
    }

    fn drop_frame_resource(&mut self) {
        self.state.borrow_mut().resources_dropped += 1;
    }

    fn unmap_staging(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if !state.staging_mapped {
            return Err(FakeError("unmap without map"));
        }
        state.staging_mapped = false;
        state.unmaps += 1;

        Ok(())
    }

    fn release_frame(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if !state.frame_held {
            return Err(FakeError("release without acquire"));
        }
        state.frame_held = false;
        state.frames_released += 1;

        Ok(())
    }
}
