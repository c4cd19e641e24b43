use desktop_capture::{LabelledWinResult, WinError};
use windows::{
    Win32::{
        Foundation::E_ACCESSDENIED,
        System::Threading::{CreateMutexW, MUTEX_ALL_ACCESS, OpenMutexW},
        UI::HiDpi::{DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext},
    },
    core::{HRESULT, HSTRING},
};

/// Checks if another instance of the app is running by using a Windows system mutex.
pub fn is_first_instance() -> LabelledWinResult<bool> {
    let mutex_name = HSTRING::from("Hyperion-Screen-Capture-Process-Mutex\0");

    // Check if the mutex was taken
    let mutex_taken = {
        const MUTEX_WASNT_TAKEN: i32 = 0x80070002u32 as i32;

        match unsafe { OpenMutexW(MUTEX_ALL_ACCESS, true, &mutex_name) } {
            Ok(_) => true,
            Err(error) => {
                if error.code() == HRESULT(MUTEX_WASNT_TAKEN) {
                    false
                } else {
                    return Err(WinError::new(error, "OpenMutexW"));
                }
            }
        }
    };

    if mutex_taken {
        return Ok(false);
    }

    // The handle is released by the OS when the process exits.
    unsafe { CreateMutexW(None, true, &mutex_name) }
        .map_err(|e| WinError::new(e, "CreateMutexW"))?;

    Ok(true)
}

/// Makes the process per-monitor DPI aware, duplicating an output requires it.
///
/// Succeeds if the awareness was already set by a manifest or an earlier call.
pub fn set_dpi_awareness() -> LabelledWinResult<()> {
    match unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
        Ok(()) => Ok(()),
        Err(error) if error.code() == E_ACCESSDENIED => Ok(()),
        Err(error) => Err(WinError::new(error, "SetProcessDpiAwarenessContext")),
    }
}
