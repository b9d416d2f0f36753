// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

// Binary frames of the Stellarium telescope server protocol. All fields are
// little-endian.
//
// Client "goto" request, 20 bytes:
//   u16 length, u16 type, u64 client time   (ignored)
//   u32 RA    (0x100000000 = 360 degrees)
//   i32 Dec   (0x40000000 = 90 degrees)
//
// Server "current position" report, 24 bytes:
//   u16 length (=24), u16 type (=0), u64 time (=0)
//   u32 RA, i32 Dec, i32 status (0 = ok, < 0 = error)

use crate::angle_codec::{decode_stellarium_dec, decode_stellarium_ra,
                         encode_stellarium_dec, encode_stellarium_ra};

pub const GOTO_REQUEST_SIZE: usize = 20;
pub const POSITION_REPORT_SIZE: usize = 24;

// Values for PositionReport::status.
pub const STATUS_OK: i32 = 0;
pub const STATUS_GOTO_REJECTED: i32 = -1;
// The mount could not be reached. The report repeats the last known position,
// or (0, 0) if the mount has never been read.
pub const STATUS_MOUNT_ERROR: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GotoRequest {
    pub ra_raw: u32,
    pub dec_raw: i32,
}

impl GotoRequest {
    pub fn parse(buf: &[u8; GOTO_REQUEST_SIZE]) -> Self {
        // Bytes 0..12 hold length, type and time, none of which we use.
        let ra_raw = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
        let dec_raw = i32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
        GotoRequest { ra_raw, dec_raw }
    }

    pub fn to_bytes(&self) -> [u8; GOTO_REQUEST_SIZE] {
        let mut buf = [0u8; GOTO_REQUEST_SIZE];
        buf[0..2].copy_from_slice(&(GOTO_REQUEST_SIZE as u16).to_le_bytes());
        buf[12..16].copy_from_slice(&self.ra_raw.to_le_bytes());
        buf[16..20].copy_from_slice(&self.dec_raw.to_le_bytes());
        buf
    }

    /// Builds a request for the given RA (0..360) and Dec, degrees.
    pub fn from_degrees(ra: f64, dec: f64) -> Self {
        GotoRequest {
            ra_raw: encode_stellarium_ra(ra),
            dec_raw: encode_stellarium_dec(dec),
        }
    }

    pub fn ra(&self) -> f64 {
        decode_stellarium_ra(self.ra_raw)
    }

    pub fn dec(&self) -> f64 {
        decode_stellarium_dec(self.dec_raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReport {
    pub ra_raw: u32,
    pub dec_raw: i32,
    pub status: i32,
}

impl PositionReport {
    /// `ra` must be in 0..360.
    pub fn new(ra: f64, dec: f64, status: i32) -> Self {
        PositionReport {
            ra_raw: encode_stellarium_ra(ra),
            dec_raw: encode_stellarium_dec(dec),
            status,
        }
    }

    pub fn to_bytes(&self) -> [u8; POSITION_REPORT_SIZE] {
        let mut buf = [0u8; POSITION_REPORT_SIZE];
        buf[0..2].copy_from_slice(&(POSITION_REPORT_SIZE as u16).to_le_bytes());
        // Type (2..4) and time (4..12) stay zero.
        buf[12..16].copy_from_slice(&self.ra_raw.to_le_bytes());
        buf[16..20].copy_from_slice(&self.dec_raw.to_le_bytes());
        buf[20..24].copy_from_slice(&self.status.to_le_bytes());
        buf
    }

    pub fn parse(buf: &[u8; POSITION_REPORT_SIZE]) -> Self {
        PositionReport {
            ra_raw: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            dec_raw: i32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            status: i32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        }
    }

    pub fn ra(&self) -> f64 {
        decode_stellarium_ra(self.ra_raw)
    }

    pub fn dec(&self) -> f64 {
        decode_stellarium_dec(self.dec_raw)
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_parse_goto_request() {
        let mut buf = [0xAAu8; GOTO_REQUEST_SIZE];
        buf[12..16].copy_from_slice(&[0x00, 0x00, 0x00, 0x40]);
        buf[16..20].copy_from_slice(&[0x00, 0x00, 0x00, 0x20]);
        let request = GotoRequest::parse(&buf);
        assert_eq!(request.ra_raw, 0x4000_0000);
        assert_eq!(request.dec_raw, 0x2000_0000);
        assert_abs_diff_eq!(request.ra(), 90.0);
        assert_abs_diff_eq!(request.dec(), 45.0);
    }

    #[test]
    fn test_negative_dec_request() {
        let request = GotoRequest::parse(
            &GotoRequest::from_degrees(350.0, -30.0).to_bytes());
        assert_abs_diff_eq!(request.ra(), 350.0, epsilon = 1e-6);
        assert_abs_diff_eq!(request.dec(), -30.0, epsilon = 1e-6);
    }

    #[test]
    fn test_position_report_layout() {
        let bytes = PositionReport::new(90.0, -45.0, STATUS_GOTO_REJECTED).to_bytes();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 24);
        assert_eq!(&bytes[2..12], &[0u8; 10]);
        assert_eq!(&bytes[12..16], &[0x00, 0x00, 0x00, 0x40]);
        assert_eq!(i32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
                   -0x2000_0000);
        assert_eq!(&bytes[20..24], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_size_field_independent_of_position() {
        for (ra, dec) in [(0.0, 0.0), (359.99, 89.9), (123.4, -89.9)] {
            let bytes = PositionReport::new(ra, dec, STATUS_OK).to_bytes();
            assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 24);
        }
    }
}
