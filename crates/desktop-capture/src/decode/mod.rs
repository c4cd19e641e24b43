//! Conversion of mapped staging memory into packed RGB frames.
//!

pub mod half_float;

use alloc::sync::Arc;
use core::iter;

use thiserror::Error;

use crate::PixelFormat;

/// A decoded frame, `width * height * 3` bytes of row-major R, G, B.
pub type FrameBuffer = Arc<[u8]>;

/// CPU-visible memory of a mapped staging texture.
#[derive(Clone, Copy, Debug)]
pub struct MappedFrame<'a> {
    /// The mapped bytes, at least `row_pitch * (height - 1) + width * bytes_per_pixel` long.
    pub data: &'a [u8],

    /// Distance in bytes between the start of two rows, may include alignment padding.
    pub row_pitch: usize,
}

/// Decodes mapped frames of a fixed size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDecoder {
    width: usize,
    height: usize,
}

impl FrameDecoder {
    /// Creates a decoder for frames of `size` pixels.
    pub fn new(size: [u32; 2]) -> Self {
        Self {
            width: size[0] as usize,
            height: size[1] as usize,
        }
    }

    /// The length in bytes of every frame this decoder produces.
    pub fn output_len(&self) -> usize {
        self.width * self.height * 3
    }

    /// Decodes `mapped` into a new RGB frame, dropping alpha.
    pub fn decode(
        &self,
        mapped: &MappedFrame<'_>,
        format: PixelFormat,
    ) -> Result<FrameBuffer, DecodeError> {
        let row_len = self.width * format.bytes_per_pixel();
        self.check_bounds(mapped, row_len)?;

        // Collecting from `repeat_n` allocates the shared frame once, at its final size.
        let mut frame: FrameBuffer = iter::repeat_n(0u8, self.output_len()).collect();
        let Some(output) = Arc::get_mut(&mut frame) else {
            unreachable!("A newly collected frame has a single owner");
        };

        match format {
            PixelFormat::Rgba16Float => self.decode_rows(mapped, row_len, output, |pixel| {
                [
                    half_float::unorm8_from_f16_le(pixel[0], pixel[1]),
                    half_float::unorm8_from_f16_le(pixel[2], pixel[3]),
                    half_float::unorm8_from_f16_le(pixel[4], pixel[5]),
                ]
            }),

            PixelFormat::Bgra8 => self.decode_rows(mapped, row_len, output, |pixel| {
                let packed = packed_u32(pixel);
                [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
            }),

            // R in the low bits as DXGI lays the format out. Do not rotate the channels to match
            // older captures that read R from bits 10-19, those produced swapped colours.
            PixelFormat::Rgb10A2 => self.decode_rows(mapped, row_len, output, |pixel| {
                let packed = packed_u32(pixel);
                [
                    unorm8_from_unorm10(packed),
                    unorm8_from_unorm10(packed >> 10),
                    unorm8_from_unorm10(packed >> 20),
                ]
            }),
        }

        Ok(frame)
    }

    fn check_bounds(&self, mapped: &MappedFrame<'_>, row_len: usize) -> Result<(), DecodeError> {
        if self.height == 0 || row_len == 0 {
            return Ok(());
        }

        if mapped.row_pitch < row_len {
            return Err(DecodeError::RowPitchTooSmall {
                row_pitch: mapped.row_pitch,
                row_len,
            });
        }

        let required = mapped.row_pitch * (self.height - 1) + row_len;
        if mapped.data.len() < required {
            return Err(DecodeError::BufferTooSmall {
                len: mapped.data.len(),
                required,
            });
        }

        Ok(())
    }

    /// Walks the rows of `mapped`, writing one RGB triple per native pixel.
    #[inline]
    fn decode_rows<F>(&self, mapped: &MappedFrame<'_>, row_len: usize, output: &mut [u8], pixel: F)
    where
        F: Fn(&[u8]) -> [u8; 3],
    {
        if row_len == 0 {
            return;
        }

        let bytes_per_pixel = row_len / self.width;
        let rows = output.chunks_exact_mut(self.width * 3).take(self.height);

        for (y, output_row) in rows.enumerate() {
            let start = y * mapped.row_pitch;
            let source_row = &mapped.data[start..start + row_len];

            for (source, target) in source_row
                .chunks_exact(bytes_per_pixel)
                .zip(output_row.chunks_exact_mut(3))
            {
                target.copy_from_slice(&pixel(source));
            }
        }
    }
}

/// Widens a 10-bit channel held in the low bits of `value` to 8 bits.
#[inline]
pub fn unorm8_from_unorm10(value: u32) -> u8 {
    let channel = value & 0x3ff;
    ((channel * 1021 + 2048) >> 12).min(255) as u8
}

/// Reads a packed pixel. DXGI packs these formats little endian, so the channel layout is the
/// same on every host.
#[inline]
fn packed_u32(pixel: &[u8]) -> u32 {
    u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]])
}

/// Mapped memory that does not match the decoder's frame size.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The row pitch is smaller than one row of pixels.
    #[error("Row pitch {row_pitch} is smaller than a row of {row_len} bytes")]
    RowPitchTooSmall {
        /// The reported row pitch.
        row_pitch: usize,
        /// The bytes of pixel data in one row.
        row_len: usize,
    },

    /// The mapped memory ends before the last row.
    #[error("Mapped buffer of {len} bytes is smaller than the required {required} bytes")]
    BufferTooSmall {
        /// The mapped length.
        len: usize,
        /// The minimum length for the frame size.
        required: usize,
    },
}
