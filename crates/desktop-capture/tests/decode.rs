//! Tests for decoding mapped frames
//!

use desktop_capture::{
    DecodeError, FrameDecoder, MappedFrame, PixelFormat,
    decode::{
        half_float::{f32_from_f16_bits, unorm8_from_f16_le},
        unorm8_from_unorm10,
    },
};
use half::f16;
use rand::Rng;

/// Builds a mapped buffer from rows of pixel bytes, padding each row to `row_pitch`.
fn padded(rows: &[Vec<u8>], row_pitch: usize, padding: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(row_pitch * rows.len());
    for row in rows {
        data.extend_from_slice(row);
        data.resize(data.len() + row_pitch - row.len(), padding);
    }
    data
}

fn half_bytes(value: f32) -> [u8; 2] {
    f16::from_f32(value).to_bits().to_le_bytes()
}

fn unorm8_from_f16_bits(bits: u16) -> u8 {
    let [low, high] = bits.to_le_bytes();
    unorm8_from_f16_le(low, high)
}

#[test]
fn bgra_rows_with_padding() {
    let rows = vec![
        vec![1, 2, 3, 255, 4, 5, 6, 255, 7, 8, 9, 255],
        vec![10, 11, 12, 0, 13, 14, 15, 0, 16, 17, 18, 0],
    ];
    let data = padded(&rows, 16, 0xee);

    let decoder = FrameDecoder::new([3, 2]);
    let frame = decoder
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 16,
            },
            PixelFormat::Bgra8,
        )
        .unwrap();

    assert_eq!(decoder.output_len(), 18);
    assert_eq!(
        &*frame,
        &[3, 2, 1, 6, 5, 4, 9, 8, 7, 12, 11, 10, 15, 14, 13, 18, 17, 16]
    );
}

#[test]
fn random_padded_frames() {
    let mut rng = rand::rng();

    for _ in 0..32 {
        let width: usize = rng.random_range(1..=24);
        let height: usize = rng.random_range(1..=24);
        let row_pitch = width * 4 + rng.random_range(0..=64);

        let mut data = vec![0u8; row_pitch * height];
        rng.fill(&mut data[..]);

        let decoder = FrameDecoder::new([width as u32, height as u32]);
        let mapped = MappedFrame {
            data: &data,
            row_pitch,
        };
        let frame = decoder.decode(&mapped, PixelFormat::Bgra8).unwrap();

        assert_eq!(frame.len(), width * height * 3);

        for y in 0..height {
            for x in 0..width {
                let source = &data[y * row_pitch + x * 4..][..4];
                let target = &frame[(y * width + x) * 3..][..3];
                assert_eq!(target, [source[2], source[1], source[0]]);
            }
        }

        assert_eq!(decoder.decode(&mapped, PixelFormat::Bgra8).unwrap(), frame);
    }
}

#[test]
fn rgb10_channels() {
    let pack = |r: u32, g: u32, b: u32, a: u32| (r | (g << 10) | (b << 20) | (a << 30)).to_le_bytes();

    let mut row = Vec::new();
    row.extend_from_slice(&pack(1023, 0, 512, 3));
    row.extend_from_slice(&pack(0, 1023, 0, 0));
    let data = padded(&[row], 12, 0xff);

    let frame = FrameDecoder::new([2, 1])
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 12,
            },
            PixelFormat::Rgb10A2,
        )
        .unwrap();

    assert_eq!(&*frame, &[255, 0, 128, 0, 255, 0]);
}

#[test]
fn unorm10_bounds_and_monotonic() {
    assert_eq!(unorm8_from_unorm10(0), 0);
    assert_eq!(unorm8_from_unorm10(1023), 255);

    let mut previous = 0;
    for value in 0..1024 {
        let converted = unorm8_from_unorm10(value);
        assert!(converted >= previous, "{value} decreased");
        previous = converted;
    }

    // Only the low ten bits are read.
    assert_eq!(unorm8_from_unorm10(0xffff_fc00), 0);
}

#[test]
fn half_float_pixels() {
    let mut row = Vec::new();
    for value in [1.0, 0.0, 8.0, 1.0] {
        row.extend_from_slice(&half_bytes(value));
    }
    for value in [0.0, 4.6, -1.0, 0.0] {
        row.extend_from_slice(&half_bytes(value));
    }
    let data = padded(&[row], 32, 0);

    let frame = FrameDecoder::new([2, 1])
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 32,
            },
            PixelFormat::Rgba16Float,
        )
        .unwrap();

    assert_eq!(&*frame, &[118, 0, 255, 0, 255, 0]);
}

#[test]
fn half_float_calibration() {
    assert_eq!(unorm8_from_f16_bits(0x0000), 0);
    assert_eq!(unorm8_from_f16_bits(0x8000), 0);
    // 4.6015625, the closest half above the calibration scale
    assert_eq!(unorm8_from_f16_bits(0x449a), 255);
    assert_eq!(unorm8_from_f16_bits(f16::from_f32(8.0).to_bits()), 255);
    assert_eq!(unorm8_from_f16_bits(f16::INFINITY.to_bits()), 255);
    assert_eq!(unorm8_from_f16_bits(f16::NEG_INFINITY.to_bits()), 0);
    assert_eq!(unorm8_from_f16_bits(f16::NAN.to_bits()), 0);
    assert_eq!(unorm8_from_f16_bits(f16::ONE.to_bits()), 118);
}

#[test]
fn half_float_is_pure() {
    for bits in (0..=u16::MAX).step_by(7) {
        assert_eq!(unorm8_from_f16_bits(bits), unorm8_from_f16_bits(bits));
    }
}

#[test]
fn half_float_matches_reference_conversion() {
    for bits in 0..=u16::MAX {
        let reference = f16::from_bits(bits);
        let converted = f32_from_f16_bits(bits);

        if reference.is_nan() {
            assert!(converted.is_nan(), "{bits:#06x} must stay NaN");
            continue;
        }

        let reference = reference.to_f32();
        let exponent = (bits >> 10) & 0x1f;
        let mantissa = bits & 0x3ff;

        // Normal powers of two above the second binade are nudged up.
        if mantissa == 0 && exponent > 1 && exponent < 0x1f {
            assert_eq!(converted.to_bits(), reference.to_bits() | 0x3ff, "{bits:#06x}");
            let relative = ((converted - reference) / reference).abs();
            assert!(relative < 2e-4, "{bits:#06x} off by {relative}");
        } else {
            assert_eq!(converted.to_bits(), reference.to_bits(), "{bits:#06x}");
        }
    }
}

#[test]
fn row_pitch_too_small() {
    let data = vec![0u8; 64];

    let error = FrameDecoder::new([4, 2])
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 8,
            },
            PixelFormat::Bgra8,
        )
        .unwrap_err();

    assert_eq!(
        error,
        DecodeError::RowPitchTooSmall {
            row_pitch: 8,
            row_len: 16
        }
    );
}

#[test]
fn buffer_too_small() {
    let data = vec![0u8; 40];

    let error = FrameDecoder::new([4, 2])
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 32,
            },
            PixelFormat::Rgba16Float,
        )
        .unwrap_err();

    assert_eq!(
        error,
        DecodeError::BufferTooSmall {
            len: 40,
            required: 64
        }
    );
}

#[test]
fn last_row_needs_no_padding() {
    // Two rows of one pixel, the second row is not padded.
    let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];

    let frame = FrameDecoder::new([1, 2])
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 8,
            },
            PixelFormat::Bgra8,
        )
        .unwrap();

    assert_eq!(&*frame, &[3, 2, 1, 7, 6, 5]);
}

#[test]
fn decoded_frame_is_exactly_sized_and_unshared() {
    let decoder = FrameDecoder::new([3, 2]);
    let data = padded(&[vec![9; 12], vec![9; 12]], 16, 0);

    let frame = decoder
        .decode(
            &MappedFrame {
                data: &data,
                row_pitch: 16,
            },
            PixelFormat::Bgra8,
        )
        .unwrap();

    assert_eq!(frame.len(), decoder.output_len());
    assert_eq!(std::sync::Arc::strong_count(&frame), 1);
    assert!(frame.iter().all(|&channel| channel == 9));
}
