use tracing::warn;
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory1, DXGI_ERROR_NOT_FOUND, IDXGIAdapter1, IDXGIFactory1,
};

use crate::{AdapterInfo, LabelledWinResult, OutputInfo, WinError, string_from_wide};

/// Lists every adapter and its outputs.
///
/// Enumeration is read-only and every handle is released before returning. Failures are logged
/// and yield an empty list.
pub fn list_adapters() -> Vec<AdapterInfo> {
    match enumerate_adapters() {
        Ok(adapters) => adapters,
        Err(e) => {
            warn!("Failed to enumerate adapters:\n{e}");
            Vec::new()
        }
    }
}

fn enumerate_adapters() -> LabelledWinResult<Vec<AdapterInfo>> {
    let factory: IDXGIFactory1 =
        unsafe { CreateDXGIFactory1() }.map_err(|e| WinError::new(e, "CreateDXGIFactory1"))?;

    let mut adapters = Vec::new();

    for index in 0u32.. {
        let adapter = match unsafe { factory.EnumAdapters1(index) } {
            Ok(adapter) => adapter,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => return Err(WinError::new(e, "IDXGIFactory1::EnumAdapters1")),
        };

        let desc = unsafe { adapter.GetDesc1() }
            .map_err(|e| WinError::new(e, "IDXGIAdapter1::GetDesc1"))?;

        adapters.push(AdapterInfo {
            index,
            name: string_from_wide(&desc.Description),
            outputs: enumerate_outputs(&adapter)?,
        });
    }

    Ok(adapters)
}

fn enumerate_outputs(adapter: &IDXGIAdapter1) -> LabelledWinResult<Vec<OutputInfo>> {
    let mut outputs = Vec::new();

    for index in 0u32.. {
        let output = match unsafe { adapter.EnumOutputs(index) } {
            Ok(output) => output,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => return Err(WinError::new(e, "IDXGIAdapter::EnumOutputs")),
        };

        let desc =
            unsafe { output.GetDesc() }.map_err(|e| WinError::new(e, "IDXGIOutput::GetDesc"))?;
        let bounds = desc.DesktopCoordinates;

        outputs.push(OutputInfo {
            index,
            device_name: string_from_wide(&desc.DeviceName),
            width: (bounds.right - bounds.left).max(0) as u32,
            height: (bounds.bottom - bounds.top).max(0) as u32,
        });
    }

    Ok(outputs)
}
