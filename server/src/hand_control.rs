// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

// Emulates the hand controller's direction keys from a terminal. Each key
// line nudges the mount by a fixed step using relative alt/az slews. The mount
// must finish (or at least accept) one slew before the next key is handled.

use std::io::BufRead;

use log::{info, warn};

use nexstar_elements::bridge_error::BridgeResult;
use nexstar_elements::mount_trait::MountTrait;

pub const DEFAULT_STEP: f64 = 2.0;  // Degrees.

pub const USAGE: &str = "\
Use w/s to raise/lower altitude and a/d to move azimuth left/right, \
followed by Enter. q quits. Each key waits for the mount to accept the \
previous slew.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JogKey {
    Up,
    Down,
    Left,
    Right,
    Quit,
}

impl JogKey {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "w" | "W" | "up" => Some(JogKey::Up),
            "s" | "S" | "down" => Some(JogKey::Down),
            "a" | "A" | "left" => Some(JogKey::Left),
            "d" | "D" | "right" => Some(JogKey::Right),
            "q" | "Q" | "quit" => Some(JogKey::Quit),
            _ => None,
        }
    }

    // (altitude, azimuth) increments for one press.
    fn increments(&self, step: f64) -> (f64, f64) {
        match self {
            JogKey::Up => (step, 0.0),
            JogKey::Down => (-step, 0.0),
            JogKey::Left => (0.0, -step),
            JogKey::Right => (0.0, step),
            JogKey::Quit => (0.0, 0.0),
        }
    }
}

/// Reads key lines from `input` until EOF or quit, slewing `mount` by `step`
/// degrees per key. Returns the number of slews the mount accepted. Mount
/// errors end the session.
pub fn run_jog<R: BufRead>(mount: &mut dyn MountTrait, input: R, step: f64)
                           -> BridgeResult<usize> {
    let mut accepted = 0;
    for line in input.lines() {
        let line = line?;
        let key = match JogKey::parse(&line) {
            Some(JogKey::Quit) => break,
            Some(key) => key,
            None => {
                if !line.trim().is_empty() {
                    warn!("Unrecognized key: {:?}", line.trim());
                }
                continue;
            }
        };
        let (alt_increment, az_increment) = key.increments(step);
        if mount.slew_relative(alt_increment, az_increment)? {
            accepted += 1;
        } else {
            warn!("Mount rejected {:?} slew", key);
        }
    }
    info!("Jog finished after {} slews", accepted);
    Ok(accepted)
}
