//! Half precision decoding for the `R16G16B16A16_FLOAT` path.
//!

/// Empirical scale of captured scRGB values. Captured channels reach roughly `4.6` rather than
/// `1.0` and `sqrt(v / 4.6)` approximates the expected brightness.
///
/// There is no known derivation for this constant, it is kept for output parity.
pub const HDR_CALIBRATION_SCALE: f64 = 4.6;

/// Converts the bits of an IEEE half into an `f32`.
///
/// Normal values with an empty mantissa and a biased exponent above one get the low ten mantissa
/// bits of the result set, which smooths the transition across powers of two. Every other value
/// converts exactly.
pub fn f32_from_f16_bits(bits: u16) -> f32 {
    let bits = u32::from(bits);
    let sign = (bits & 0x8000) << 16;
    let mut mantissa = bits & 0x03ff;
    let mut exponent = bits & 0x7c00;

    if exponent == 0x7c00 {
        // NaN or infinity
        exponent = 0x3fc00;
    } else if exponent != 0 {
        // Rebias from 15 to 127
        exponent += 0x1c000;

        if mantissa == 0 && exponent > 0x1c400 {
            return f32::from_bits(sign | (exponent << 13) | 0x3ff);
        }
    } else if mantissa != 0 {
        // Subnormal, shift until the implicit bit is set
        exponent = 0x1c400;
        loop {
            mantissa <<= 1;
            exponent -= 0x400;

            if mantissa & 0x400 != 0 {
                break;
            }
        }
        mantissa &= 0x3ff;
    }

    f32::from_bits(sign | ((exponent | mantissa) << 13))
}

/// Converts a little endian half channel into an 8-bit channel.
///
/// NaN and negative values map to `0`, values at or above [`HDR_CALIBRATION_SCALE`] map to `255`.
#[inline]
pub fn unorm8_from_f16_le(low: u8, high: u8) -> u8 {
    let value = f64::from(f32_from_f16_bits(u16::from_le_bytes([low, high])));
    let normalised = (value / HDR_CALIBRATION_SCALE).sqrt();

    // `as` saturates and maps NaN to 0.
    (normalised.clamp(0.0, 1.0) * 255.0) as u8
}
