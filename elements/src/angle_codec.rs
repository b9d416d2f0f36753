// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Conversions between degrees and the fixed-point angle encodings used on
//! the wire. All encoders truncate toward negative infinity; the results must
//! match the reference encoding bit for bit.

// Stellarium telescope protocol: 0x80000000 counts per 180 degrees of RA,
// 0x40000000 counts per 90 degrees of Dec.
const STELLARIUM_RA_HALF_CIRCLE: f64 = 2147483648.0; // 2^31
const STELLARIUM_DEC_QUARTER_CIRCLE: f64 = 1073741824.0; // 2^30

// NexStar serial protocol: a signed half circle spans the full i16 range.
const MOUNT_HALF_CIRCLE: f64 = 32768.0;

/// Stellarium RA (u32, full circle) to degrees in [0, 360).
pub fn decode_stellarium_ra(raw: u32) -> f64 {
    180.0 * (raw as f64 / STELLARIUM_RA_HALF_CIRCLE)
}

/// Stellarium Dec (i32) to degrees in [-90, 90].
pub fn decode_stellarium_dec(raw: i32) -> f64 {
    90.0 * (raw as f64 / STELLARIUM_DEC_QUARTER_CIRCLE)
}

/// Degrees to Stellarium RA. `deg` must already be in [0, 360); anything
/// outside saturates.
pub fn encode_stellarium_ra(deg: f64) -> u32 {
    ((deg / 180.0) * STELLARIUM_RA_HALF_CIRCLE).floor() as u32
}

/// Degrees to Stellarium Dec.
pub fn encode_stellarium_dec(deg: f64) -> i32 {
    ((deg / 90.0) * STELLARIUM_DEC_QUARTER_CIRCLE).floor() as i32
}

/// Mount angle (i16, signed half circle) to degrees in [-180, 180).
pub fn decode_mount_angle(raw: i16) -> f64 {
    180.0 * (raw as f64 / MOUNT_HALF_CIRCLE)
}

/// Degrees to mount angle. The i16 spans exactly one full circle, so angles
/// outside [-180, 180) wrap around it (181 is sent as -179).
pub fn encode_mount_angle(deg: f64) -> i16 {
    let counts = ((deg / 180.0) * MOUNT_HALF_CIRCLE).floor() as i64;
    // Reduce modulo the full circle after flooring, so in-range angles keep
    // their exact encoding.
    let full_circle = 2 * MOUNT_HALF_CIRCLE as i64;
    ((counts + full_circle / 2).rem_euclid(full_circle) - full_circle / 2) as i16
}

/// Maps RA from [0, 360) onto the mount's signed half circle.
pub fn fold_ra(ra: f64) -> f64 {
    if ra > 180.0 {
        ra - 360.0
    } else {
        ra
    }
}

/// Inverse of `fold_ra()`: maps a signed RA back into [0, 360).
pub fn unfold_ra(ra: f64) -> f64 {
    if ra < 0.0 {
        ra + 360.0
    } else {
        ra
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    // One least significant bit of each encoding, in degrees.
    const RA_LSB: f64 = 360.0 / 4294967296.0;
    const DEC_LSB: f64 = 90.0 / 1073741824.0;
    const MOUNT_LSB: f64 = 180.0 / 32768.0;

    #[test]
    fn test_stellarium_known_values() {
        assert_abs_diff_eq!(decode_stellarium_ra(0x4000_0000), 90.0);
        assert_abs_diff_eq!(decode_stellarium_ra(0x8000_0000), 180.0);
        assert_abs_diff_eq!(decode_stellarium_dec(0x2000_0000), 45.0);
        assert_abs_diff_eq!(decode_stellarium_dec(-0x4000_0000), -90.0);

        assert_eq!(encode_stellarium_ra(90.0), 0x4000_0000);
        assert_eq!(encode_stellarium_ra(0.0), 0);
        assert_eq!(encode_stellarium_dec(45.0), 0x2000_0000);
        assert_eq!(encode_stellarium_dec(90.0), 0x4000_0000);
        assert_eq!(encode_stellarium_dec(-90.0), -0x4000_0000);
    }

    #[test]
    fn test_encoders_floor_toward_negative_infinity() {
        // -0.5 LSB must go to -1, not 0.
        assert_eq!(encode_stellarium_dec(-DEC_LSB / 2.0), -1);
        assert_eq!(encode_mount_angle(-MOUNT_LSB / 2.0), -1);
        assert_eq!(encode_mount_angle(MOUNT_LSB / 2.0), 0);
        assert_eq!(encode_mount_angle(-90.0), -16384);
    }

    #[test]
    fn test_stellarium_ra_round_trip() {
        let mut prev_raw = 0_u32;
        let mut deg = 0.0;
        while deg < 360.0 {
            let raw = encode_stellarium_ra(deg);
            assert!(raw >= prev_raw, "Not monotonic at {}", deg);
            prev_raw = raw;
            let back = decode_stellarium_ra(raw);
            assert_abs_diff_eq!(back, deg, epsilon = RA_LSB);
            deg += 0.37;
        }
        assert_abs_diff_eq!(decode_stellarium_ra(encode_stellarium_ra(359.9999)),
                            359.9999, epsilon = RA_LSB);
    }

    #[test]
    fn test_stellarium_dec_round_trip() {
        let mut deg = -90.0;
        while deg <= 90.0 {
            let back = decode_stellarium_dec(encode_stellarium_dec(deg));
            assert_abs_diff_eq!(back, deg, epsilon = DEC_LSB);
            deg += 0.13;
        }
    }

    #[test]
    fn test_mount_angle_round_trip() {
        let mut deg = -180.0;
        while deg < 180.0 {
            let back = decode_mount_angle(encode_mount_angle(deg));
            assert_abs_diff_eq!(back, deg, epsilon = MOUNT_LSB);
            deg += 0.29;
        }
        assert_eq!(encode_mount_angle(90.0), 16384);
        assert_eq!(encode_mount_angle(45.0), 8192);
        assert_abs_diff_eq!(decode_mount_angle(i16::MIN), -180.0);
    }

    #[test]
    fn test_mount_angle_wraps_around_circle() {
        // floor(181 / 180 * 32768) = 32950, one full circle past -32586.
        assert_eq!(encode_mount_angle(181.0), -32586);
        assert_eq!(encode_mount_angle(270.0), -16384);
        assert_eq!(encode_mount_angle(180.0), i16::MIN);
        assert_eq!(encode_mount_angle(360.0), 0);
        assert_eq!(encode_mount_angle(-190.0), encode_mount_angle(170.0));
        assert_eq!(encode_mount_angle(179.999), i16::MAX);
        assert_eq!(encode_mount_angle(-180.0), i16::MIN);
    }

    #[test]
    fn test_fold_ra() {
        assert_eq!(fold_ra(270.0), -90.0);
        assert_eq!(fold_ra(180.0), 180.0);
        assert_eq!(fold_ra(10.0), 10.0);
        assert_eq!(encode_mount_angle(fold_ra(270.0)), encode_mount_angle(-90.0));

        assert_eq!(unfold_ra(-90.0), 270.0);
        assert_eq!(unfold_ra(0.0), 0.0);
        assert_eq!(unfold_ra(-0.5), 359.5);
    }
}
