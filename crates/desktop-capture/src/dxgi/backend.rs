use tracing::{debug, instrument};
use windows::Win32::Graphics::{
    Direct3D11::{D3D11_MAP_READ, D3D11_MAPPED_SUBRESOURCE, ID3D11Texture2D},
    Dxgi::{
        Common::{
            DXGI_FORMAT, DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_R10G10B10A2_UNORM,
            DXGI_FORMAT_R16G16B16A16_FLOAT,
        },
        DXGI_ERROR_ACCESS_LOST, DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO, IDXGIOutput5,
        IDXGIOutputDuplication, IDXGIResource,
    },
};
use windows_core::Interface;

use crate::{
    AcquireOutcome, CaptureBackend, CaptureConfig, CaptureLayout, FrameInfo, LabelledWinResult,
    MappedFrame, NegotiatedFormat, PixelFormat, UnsupportedFormat, WinError,
};

use super::{device::DxgiDevices, textures::CaptureTextures};

/// Formats offered to the duplication, in order of preference.
const SUPPORTED_FORMATS: [DXGI_FORMAT; 2] =
    [DXGI_FORMAT_R16G16B16A16_FLOAT, DXGI_FORMAT_B8G8R8A8_UNORM];

/// Desktop duplication of one output through Direct3D 11.
///
/// Fields are declared in reverse acquisition order, dropping the backend releases the frame,
/// duplication, textures, output, then devices.
pub struct DxgiBackend {
    frame: Option<ID3D11Texture2D>,
    frame_acquired: bool,
    staging_mapped: bool,
    duplication: Option<IDXGIOutputDuplication>,
    textures: Option<CaptureTextures>,
    output: IDXGIOutput5,
    devices: DxgiDevices,
}

impl DxgiBackend {
    fn duplication(&self, call: &'static str) -> LabelledWinResult<&IDXGIOutputDuplication> {
        self.duplication
            .as_ref()
            .ok_or_else(|| WinError::missing("IDXGIOutputDuplication", call))
    }

    fn textures(&self, call: &'static str) -> LabelledWinResult<&CaptureTextures> {
        self.textures
            .as_ref()
            .ok_or_else(|| WinError::missing("staging texture", call))
    }
}

impl CaptureBackend for DxgiBackend {
    type Error = WinError;

    #[instrument("DxgiBackend::open", skip_all, err)]
    fn open(config: &CaptureConfig) -> Result<Self, Self::Error> {
        let devices = DxgiDevices::new(config.adapter_index)?;
        let output = devices.output(config.monitor_index)?;

        Ok(Self {
            frame: None,
            frame_acquired: false,
            staging_mapped: false,
            duplication: None,
            textures: None,
            output,
            devices,
        })
    }

    fn desktop_size(&mut self) -> Result<[u32; 2], Self::Error> {
        let desc = unsafe { self.output.GetDesc() }
            .map_err(|e| WinError::new(e, "IDXGIOutput::GetDesc"))?;

        let bounds = desc.DesktopCoordinates;
        let width = (bounds.right - bounds.left).max(0) as u32;
        let height = (bounds.bottom - bounds.top).max(0) as u32;

        Ok([width, height])
    }

    #[instrument("DxgiBackend::open_duplication", skip_all, err)]
    fn open_duplication(&mut self, layout: &CaptureLayout) -> Result<NegotiatedFormat, Self::Error> {
        self.release_duplication()?;
        self.textures = None;

        let duplication = unsafe {
            self.output
                .DuplicateOutput1(&self.devices.device, 0, &SUPPORTED_FORMATS)
        }
        .map_err(|e| WinError::new(e, "IDXGIOutput5::DuplicateOutput1"))?;

        let dxgi_format = unsafe { duplication.GetDesc() }.ModeDesc.Format;
        let format = pixel_format(dxgi_format);
        debug!("Duplication negotiated {dxgi_format:?} ({format:?})");

        self.textures = Some(CaptureTextures::new(
            &self.devices.device,
            layout,
            dxgi_format,
        )?);
        self.duplication = Some(duplication);

        Ok(format)
    }

    fn release_duplication(&mut self) -> Result<(), Self::Error> {
        self.frame = None;
        self.frame_acquired = false;
        self.duplication = None;

        Ok(())
    }

    fn acquire_frame(&mut self, timeout_ms: u32) -> Result<AcquireOutcome, Self::Error> {
        const CALL: &str = "IDXGIOutputDuplication::AcquireNextFrame";

        let duplication = self.duplication(CALL)?;

        let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;

        if let Err(e) = unsafe { duplication.AcquireNextFrame(timeout_ms, &mut info, &mut resource) }
        {
            return match e.code() {
                DXGI_ERROR_WAIT_TIMEOUT => Ok(AcquireOutcome::Timeout),
                DXGI_ERROR_ACCESS_LOST => Ok(AcquireOutcome::AccessLost),
                _ => Err(WinError::new(e, CALL)),
            };
        }
        self.frame_acquired = true;

        let resource = resource.ok_or_else(|| WinError::missing("IDXGIResource", CALL))?;
        let frame = resource
            .cast()
            .map_err(|e| WinError::new(e, "IDXGIResource::cast<ID3D11Texture2D>"))?;
        self.frame = Some(frame);

        Ok(AcquireOutcome::Frame(FrameInfo {
            last_present_time: info.LastPresentTime,
        }))
    }

    fn copy_to_staging(&mut self, layout: &CaptureLayout) -> Result<(), Self::Error> {
        const CALL: &str = "ID3D11DeviceContext::CopyResource";

        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| WinError::missing("acquired frame", CALL))?;
        let textures = self.textures(CALL)?;
        let context = &self.devices.context;

        match &textures.downscale {
            Some(downscale) => unsafe {
                context.CopySubresourceRegion(&downscale.texture, 0, 0, 0, 0, frame, 0, None);
                context.GenerateMips(&downscale.view);
                context.CopySubresourceRegion(
                    &textures.staging,
                    0,
                    0,
                    0,
                    0,
                    &downscale.texture,
                    layout.mip_slice,
                    None,
                );
            },

            None => unsafe { context.CopyResource(&textures.staging, frame) },
        }

        Ok(())
    }

    fn map_staging(&mut self) -> Result<MappedFrame<'_>, Self::Error> {
        const CALL: &str = "ID3D11DeviceContext::Map";

        let textures = self.textures(CALL)?;

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.devices
                .context
                .Map(&textures.staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
        }
        .map_err(|e| WinError::new(e, CALL))?;
        self.staging_mapped = true;

        if mapped.pData.is_null() {
            return Err(WinError::missing("mapped memory", CALL));
        }

        let row_pitch = mapped.RowPitch as usize;
        // The whole mapped subresource, the decoder checks it covers every row.
        let len = mapped.DepthPitch as usize;

        // The mapping stays valid until `unmap_staging`, which needs `&mut self`.
        let data = unsafe { core::slice::from_raw_parts(mapped.pData.cast::<u8>(), len) };

        Ok(MappedFrame { data, row_pitch })
    }

    fn drop_frame_resource(&mut self) {
        self.frame = None;
    }

    fn unmap_staging(&mut self) -> Result<(), Self::Error> {
        if !self.staging_mapped {
            return Ok(());
        }
        self.staging_mapped = false;

        let textures = self.textures("ID3D11DeviceContext::Unmap")?;
        unsafe { self.devices.context.Unmap(&textures.staging, 0) };

        Ok(())
    }

    fn release_frame(&mut self) -> Result<(), Self::Error> {
        const CALL: &str = "IDXGIOutputDuplication::ReleaseFrame";

        if !self.frame_acquired {
            return Ok(());
        }
        self.frame_acquired = false;

        let duplication = self.duplication(CALL)?;
        unsafe { duplication.ReleaseFrame() }.map_err(|e| WinError::new(e, CALL))
    }
}

impl Drop for DxgiBackend {
    fn drop(&mut self) {
        if let Err(e) = self.unmap_staging() {
            debug!("Failed to unmap staging texture on drop:\n{e}");
        }
    }
}

/// Maps a duplication format to its decode path.
fn pixel_format(format: DXGI_FORMAT) -> NegotiatedFormat {
    match format {
        DXGI_FORMAT_R16G16B16A16_FLOAT => Ok(PixelFormat::Rgba16Float),
        DXGI_FORMAT_B8G8R8A8_UNORM => Ok(PixelFormat::Bgra8),
        DXGI_FORMAT_R10G10B10A2_UNORM => Ok(PixelFormat::Rgb10A2),
        other => Err(UnsupportedFormat(other.0)),
    }
}
