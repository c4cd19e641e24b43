use thiserror::Error;

/// The pixel encodings a duplication can be negotiated into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// `R16G16B16A16_FLOAT`, 8 bytes per pixel.
    Rgba16Float,

    /// `B8G8R8A8_UNORM`, 4 bytes per pixel.
    Bgra8,

    /// `R10G10B10A2_UNORM`, 4 bytes per pixel.
    Rgb10A2,
}

impl PixelFormat {
    /// Size of one native pixel in bytes.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba16Float => 8,
            Self::Bgra8 | Self::Rgb10A2 => 4,
        }
    }
}

/// A negotiated format that has no decode path.
///
/// Holds the raw format code reported by the driver.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Texture format {0} is not supported")]
pub struct UnsupportedFormat(pub i32);

/// The format reported for a duplication, either decodable or not.
pub type NegotiatedFormat = Result<PixelFormat, UnsupportedFormat>;
