//! 80-bit IEEE 754 extended precision conversion.
//!
//! The AIFC summary chunk stores its sample rate as a big-endian 10-byte
//! extended float: sign and 15-bit biased exponent in the first two bytes,
//! then a 64-bit mantissa with an explicit integer bit.

/// Size of an encoded extended float.
pub const EXTENDED_SIZE: usize = 10;

const EXPONENT_BIAS: i32 = 16383;

/// Split `x` into a mantissa in `[0.5, 1)` and a power of two.
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i32;
    if exp == 0 {
        // Subnormal: normalize first.
        let (m, e) = frexp(x * 2f64.powi(54));
        return (m, e - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, exp - 1022)
}

/// `x * 2^e` without overflowing the intermediate power.
fn ldexp(mut x: f64, mut e: i32) -> f64 {
    while e > 1000 {
        x *= 2f64.powi(1000);
        e -= 1000;
        if x.is_infinite() {
            return x;
        }
    }
    while e < -1000 {
        x *= 2f64.powi(-1000);
        e += 1000;
        if x == 0.0 {
            return x;
        }
    }
    x * 2f64.powi(e)
}

/// Encode a double as an 80-bit extended float.
///
/// Infinity and NaN encode as the maximum exponent with a zero mantissa.
pub fn f64_to_extended(value: f64) -> [u8; EXTENDED_SIZE] {
    let (sign, mut num) = if value.is_sign_negative() && value != 0.0 {
        (0x8000u16, -value)
    } else {
        (0u16, value)
    };

    let (expon, hi, lo): (u16, u32, u32) = if num == 0.0 {
        (0, 0, 0)
    } else {
        let (mut fmant, mut expon) = frexp(num);
        if expon > 16384 || !(fmant < 1.0) {
            (sign | 0x7FFF, 0, 0)
        } else {
            expon += EXPONENT_BIAS - 1;
            if expon < 0 {
                fmant = ldexp(fmant, expon);
                expon = 0;
            }
            num = ldexp(fmant, 32);
            let hi_part = num.floor();
            num = ldexp(num - hi_part, 32);
            let lo_part = num.floor();
            (sign | expon as u16, hi_part as u32, lo_part as u32)
        }
    };

    let mut out = [0u8; EXTENDED_SIZE];
    out[0..2].copy_from_slice(&expon.to_be_bytes());
    out[2..6].copy_from_slice(&hi.to_be_bytes());
    out[6..10].copy_from_slice(&lo.to_be_bytes());
    out
}

/// Decode an 80-bit extended float.
///
/// The maximum exponent decodes as infinity regardless of mantissa.
pub fn extended_to_f64(bytes: &[u8; EXTENDED_SIZE]) -> f64 {
    let expon = (((bytes[0] & 0x7F) as i32) << 8) | bytes[1] as i32;
    let hi = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    let lo = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);

    let magnitude = if expon == 0 && hi == 0 && lo == 0 {
        0.0
    } else if expon == 0x7FFF {
        f64::INFINITY
    } else {
        let e = expon - EXPONENT_BIAS - 31;
        ldexp(hi as f64, e) + ldexp(lo as f64, e - 32)
    };

    if bytes[0] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}
