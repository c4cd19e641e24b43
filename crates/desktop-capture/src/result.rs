use core::fmt::Display;

use thiserror::Error;
use windows_core::HRESULT;

/// A shortcut for `Result<T, WinError>`.
pub type LabelledWinResult<T> = Result<T, WinError>;

/// A Windows Result wrapped with the name of the call that triggered the error.
#[derive(Debug, Error)]
pub struct WinError {
    call: &'static str,
    #[source]
    source: WinErrorSource,
}

/// Possible sources for a WinError.
#[derive(Debug, Error)]
pub enum WinErrorSource {
    /// A [windows_result::Error].
    #[error(transparent)]
    WindowsError(#[from] windows_result::Error),

    /// An object the call depends on, or should have returned, is missing.
    #[error("No {0} is available")]
    Missing(&'static str),
}

impl WinError {
    /// Create a WinError from a `windows_result::Error` and a label.
    pub fn new(source: windows_result::Error, call: &'static str) -> Self {
        Self {
            call,
            source: source.into(),
        }
    }

    /// Create a WinError for a call that is missing `object`.
    pub fn missing(object: &'static str, call: &'static str) -> Self {
        Self {
            call,
            source: WinErrorSource::Missing(object),
        }
    }

    /// The HRESULT of the failed call, `None` if the call did not fail with one.
    pub fn code(&self) -> Option<HRESULT> {
        match &self.source {
            WinErrorSource::WindowsError(error) => Some(error.code()),
            WinErrorSource::Missing(_) => None,
        }
    }

    /// The label of the call that failed.
    pub fn call(&self) -> &'static str {
        self.call
    }
}

impl Display for WinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Windows {} call failed:\n{}", self.call, self.source)
    }
}
