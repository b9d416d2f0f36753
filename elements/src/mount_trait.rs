// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use crate::bridge_error::BridgeError;

// Where the mount is pointing in equatorial coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EquatorialPosition {
    // Right ascension, degrees, 0..360.
    pub ra: f64,

    // Declination, degrees, -90..90.
    pub dec: f64,
}

// Where the mount is pointing in the mount's own horizontal frame. The
// firmware relates this to EquatorialPosition using its alignment state; we
// never convert between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HorizonPosition {
    // Altitude, degrees.
    pub alt: f64,

    // Azimuth, degrees.
    pub az: f64,
}

// Operations offered by a goto mount. Every call is a complete exchange with
// the mount; implementations keep no state between calls other than the open
// transport.
//
// The goto methods return Ok(false) when the mount answered but did not accept
// the command, and an error when the exchange itself failed:
//   HandshakeFailed: the mount did not signal ready.
//   TransportTimeout: the mount stopped responding mid-command.
//   ConnectionClosed: the link went away.
pub trait MountTrait {
    // Starts a slew to the given RA (0..360) and Dec. Does not wait for the
    // slew to finish.
    fn goto_ra_dec(&mut self, ra: f64, dec: f64) -> Result<bool, BridgeError>;

    // Starts a slew to the given altitude and azimuth.
    fn goto_alt_az(&mut self, alt: f64, az: f64) -> Result<bool, BridgeError>;

    // Requires the mount to be aligned.
    fn get_ra_dec(&mut self) -> Result<EquatorialPosition, BridgeError>;

    fn get_alt_az(&mut self) -> Result<HorizonPosition, BridgeError>;

    // Moves relative to the current alt/az position. The read and the goto are
    // separate exchanges; motion between them is not detected.
    fn slew_relative(&mut self, alt_increment: f64, az_increment: f64)
                     -> Result<bool, BridgeError> {
        let current = self.get_alt_az()?;
        self.goto_alt_az(current.alt + alt_increment,
                         current.az + az_increment)
    }
}
