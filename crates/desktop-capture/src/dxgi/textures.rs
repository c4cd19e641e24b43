use windows::Win32::Graphics::{
    Direct3D11::{
        D3D11_BIND_RENDER_TARGET, D3D11_BIND_SHADER_RESOURCE, D3D11_CPU_ACCESS_READ,
        D3D11_RESOURCE_MISC_GENERATE_MIPS, D3D11_TEXTURE2D_DESC, D3D11_USAGE_DEFAULT,
        D3D11_USAGE_STAGING, ID3D11Device, ID3D11ShaderResourceView, ID3D11Texture2D,
    },
    Dxgi::Common::{DXGI_FORMAT, DXGI_SAMPLE_DESC},
};

use crate::{CaptureLayout, LabelledWinResult, WinError};

/// Textures a duplicated frame passes through on the way to the CPU.
pub struct CaptureTextures {
    /// Present when the layout is scaled.
    pub downscale: Option<DownscaleTexture>,

    /// CPU readable, sized to the capture resolution.
    pub staging: ID3D11Texture2D,
}

/// A native sized texture with a mip chain down to the capture resolution.
pub struct DownscaleTexture {
    /// Used to generate the mips, released before the texture.
    pub view: ID3D11ShaderResourceView,

    /// Receives the duplicated frame in mip 0.
    pub texture: ID3D11Texture2D,
}

impl CaptureTextures {
    /// Creates the staging texture, and the downscale texture if `layout` is scaled.
    pub fn new(
        device: &ID3D11Device,
        layout: &CaptureLayout,
        format: DXGI_FORMAT,
    ) -> LabelledWinResult<Self> {
        let staging = {
            let desc = D3D11_TEXTURE2D_DESC {
                Width: layout.capture_size[0],
                Height: layout.capture_size[1],
                MipLevels: 1,
                ArraySize: 1,
                Format: format,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_STAGING,
                BindFlags: 0,
                CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
                MiscFlags: 0,
            };

            create_texture(device, &desc, "ID3D11Device::CreateTexture2D (staging)")?
        };

        let downscale = if layout.is_scaled() {
            let desc = D3D11_TEXTURE2D_DESC {
                Width: layout.native_size[0],
                Height: layout.native_size[1],
                MipLevels: layout.mip_levels,
                ArraySize: 1,
                Format: format,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_DEFAULT,
                BindFlags: (D3D11_BIND_RENDER_TARGET.0 | D3D11_BIND_SHADER_RESOURCE.0) as u32,
                CPUAccessFlags: 0,
                MiscFlags: D3D11_RESOURCE_MISC_GENERATE_MIPS.0 as u32,
            };

            let texture = create_texture(device, &desc, "ID3D11Device::CreateTexture2D (downscale)")?;

            let view = {
                let mut view = None;
                unsafe { device.CreateShaderResourceView(&texture, None, Some(&mut view)) }
                    .map_err(|e| WinError::new(e, "ID3D11Device::CreateShaderResourceView"))?;

                view.ok_or_else(|| {
                    WinError::missing(
                        "ID3D11ShaderResourceView",
                        "ID3D11Device::CreateShaderResourceView",
                    )
                })?
            };

            Some(DownscaleTexture { view, texture })
        } else {
            None
        };

        Ok(Self {
            downscale,
            staging,
        })
    }
}

fn create_texture(
    device: &ID3D11Device,
    desc: &D3D11_TEXTURE2D_DESC,
    call: &'static str,
) -> LabelledWinResult<ID3D11Texture2D> {
    let mut texture = None;
    unsafe { device.CreateTexture2D(desc, None, Some(&mut texture)) }
        .map_err(|e| WinError::new(e, call))?;

    texture.ok_or_else(|| WinError::missing("ID3D11Texture2D", call))
}
