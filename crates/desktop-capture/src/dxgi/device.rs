use tracing::debug;
use windows::Win32::{
    Foundation::HMODULE,
    Graphics::{
        Direct3D::D3D_DRIVER_TYPE_UNKNOWN,
        Direct3D11::{
            D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION, D3D11CreateDevice, ID3D11Device,
            ID3D11DeviceContext,
        },
        Dxgi::{CreateDXGIFactory1, IDXGIAdapter1, IDXGIFactory1, IDXGIOutput5},
    },
};
use windows_core::Interface;

use crate::{LabelledWinResult, WinError, string_from_wide};

/// The devices a duplication is created against.
///
/// Fields are declared in reverse acquisition order so they drop in that order.
pub struct DxgiDevices {
    /// Used for copies and mapping.
    pub context: ID3D11DeviceContext,

    /// Owns the duplication and the textures.
    pub device: ID3D11Device,

    /// The adapter selected by index.
    pub adapter: IDXGIAdapter1,

    /// Used to enumerate the adapter.
    pub factory: IDXGIFactory1,
}

impl DxgiDevices {
    /// Creates a device on the adapter at `adapter_index`.
    pub fn new(adapter_index: u32) -> LabelledWinResult<Self> {
        let factory: IDXGIFactory1 =
            unsafe { CreateDXGIFactory1() }.map_err(|e| WinError::new(e, "CreateDXGIFactory1"))?;

        let adapter = unsafe { factory.EnumAdapters1(adapter_index) }
            .map_err(|e| WinError::new(e, "IDXGIFactory1::EnumAdapters1"))?;

        if let Ok(desc) = unsafe { adapter.GetDesc1() } {
            debug!(
                "Using adapter {adapter_index}: {}",
                string_from_wide(&desc.Description)
            );
        }

        // An explicit adapter requires the unknown driver type.
        let device = {
            let mut device = None;
            unsafe {
                D3D11CreateDevice(
                    &adapter,
                    D3D_DRIVER_TYPE_UNKNOWN,
                    HMODULE::default(),
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    None,
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    None,
                )
            }
            .map_err(|e| WinError::new(e, "D3D11CreateDevice"))?;

            device.ok_or_else(|| WinError::missing("ID3D11Device", "D3D11CreateDevice"))?
        };

        let context = unsafe { device.GetImmediateContext() }
            .map_err(|e| WinError::new(e, "ID3D11Device::GetImmediateContext"))?;

        Ok(Self {
            context,
            device,
            adapter,
            factory,
        })
    }

    /// Gets the output at `monitor_index` on the adapter.
    pub fn output(&self, monitor_index: u32) -> LabelledWinResult<IDXGIOutput5> {
        let output = unsafe { self.adapter.EnumOutputs(monitor_index) }
            .map_err(|e| WinError::new(e, "IDXGIAdapter::EnumOutputs"))?;

        output
            .cast()
            .map_err(|e| WinError::new(e, "IDXGIOutput::cast<IDXGIOutput5>"))
    }
}
