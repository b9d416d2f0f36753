// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

// Driver for the RS-232 port of the original Celestron NexStar 5 and 8 hand
// controllers. Commands are single opcode bytes; angles travel as big-endian
// i16 values (see angle_codec::encode_mount_angle()). Replies are raw binary.

use std::io::{Read, Write};
use std::time::Duration;

use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, StopBits};

use nexstar_elements::angle_codec::{decode_mount_angle, encode_mount_angle,
                                    fold_ra, unfold_ra};
use nexstar_elements::bridge_error::{BridgeError, BridgeResult};
use nexstar_elements::mount_trait::{EquatorialPosition, HorizonPosition,
                                    MountTrait};

// NexStar serial protocol.
const INIT_QUERY: u8 = b'?';
const READY_MARKER: u8 = b'#';
const ACCEPTED_MARKER: u8 = b'@';
const GOTO_RA_DEC: u8 = b'R';
const GOTO_ALT_AZ: u8 = b'A';
const GET_RA_DEC: u8 = b'E';
const GET_ALT_AZ: u8 = b'Z';

pub const DEFAULT_BAUD_RATE: u32 = 9600;
// Bound on each serial read.
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Duplex byte stream to the mount. Reads are expected to give up with a
/// TimedOut error when the mount stays silent.
pub trait SerialLink: Read + Write + Send {}
impl<T: Read + Write + Send> SerialLink for T {}

/// Opens `path` at `baud` 8N1. `read_timeout` bounds every read so a stalled
/// mount cannot hang the caller.
pub fn open_serial_link(path: &str, baud: u32, read_timeout: Duration)
                        -> BridgeResult<Box<dyn SerialLink>> {
    let port = serialport::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(read_timeout)
        .open()
        .map_err(|e| BridgeError::PortUnavailable(
            format!("Failed to open serial port {}: {}", path, e)))?;
    info!("Opened serial port {} at {} baud", path, baud);
    Ok(Box::new(port))
}

pub struct NexStar {
    link: Box<dyn SerialLink>,
}

impl NexStar {
    pub fn new(link: Box<dyn SerialLink>) -> Self {
        NexStar { link }
    }

    pub fn open(path: &str, baud: u32, read_timeout: Duration)
                -> BridgeResult<Self> {
        Ok(NexStar::new(open_serial_link(path, baud, read_timeout)?))
    }

    // Must precede every command. The hand controller answers the query with
    // READY_MARKER when it will take a command.
    fn initialize(&mut self) -> BridgeResult<()> {
        self.write_bytes(&[INIT_QUERY], "init query")?;
        let mut reply = [0u8; 1];
        if let Err(e) = self.link.read_exact(&mut reply) {
            return Err(BridgeError::HandshakeFailed(
                format!("No reply to init query: {}", e)));
        }
        if reply[0] != READY_MARKER {
            return Err(BridgeError::HandshakeFailed(
                format!("Expected ready marker 0x{:02X}, got 0x{:02X}",
                        READY_MARKER, reply[0])));
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8], context: &str) -> BridgeResult<()> {
        self.link.write_all(bytes)
            .and_then(|_| self.link.flush())
            .map_err(|e| BridgeError::from_io(context, e))
    }

    fn read_bytes<const N: usize>(&mut self, context: &str)
                                  -> BridgeResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.link.read_exact(&mut buf)
            .map_err(|e| BridgeError::from_io(context, e))?;
        Ok(buf)
    }

    // Sends `opcode` followed by two encoded angles; true if the mount
    // accepted the slew.
    fn goto(&mut self, opcode: u8, first: i16, second: i16, context: &str)
            -> BridgeResult<bool> {
        self.initialize()?;
        let mut command = [0u8; 5];
        command[0] = opcode;
        command[1..3].copy_from_slice(&first.to_be_bytes());
        command[3..5].copy_from_slice(&second.to_be_bytes());
        self.write_bytes(&command, context)?;
        let [ack] = self.read_bytes::<1>(context)?;
        debug!("{}: ack 0x{:02X}", context, ack);
        Ok(ack == ACCEPTED_MARKER)
    }

    // Sends `opcode` and returns the two raw angles of the reply, in the order
    // the mount sent them.
    fn get_position(&mut self, opcode: u8, context: &str)
                    -> BridgeResult<(i16, i16)> {
        self.initialize()?;
        self.write_bytes(&[opcode], context)?;
        let reply = self.read_bytes::<4>(context)?;
        Ok((i16::from_be_bytes([reply[0], reply[1]]),
            i16::from_be_bytes([reply[2], reply[3]])))
    }
}

impl MountTrait for NexStar {
    fn goto_ra_dec(&mut self, ra: f64, dec: f64) -> BridgeResult<bool> {
        debug!("goto_ra_dec {} {}", ra, dec);
        self.goto(GOTO_RA_DEC,
                  encode_mount_angle(fold_ra(ra)),
                  encode_mount_angle(dec),
                  "goto_ra_dec")
    }

    fn goto_alt_az(&mut self, alt: f64, az: f64) -> BridgeResult<bool> {
        debug!("goto_alt_az {} {}", alt, az);
        // Azimuth goes first on the wire.
        self.goto(GOTO_ALT_AZ,
                  encode_mount_angle(az),
                  encode_mount_angle(alt),
                  "goto_alt_az")
    }

    fn get_ra_dec(&mut self) -> BridgeResult<EquatorialPosition> {
        let (ra_raw, dec_raw) = self.get_position(GET_RA_DEC, "get_ra_dec")?;
        Ok(EquatorialPosition {
            ra: unfold_ra(decode_mount_angle(ra_raw)),
            dec: decode_mount_angle(dec_raw),
        })
    }

    fn get_alt_az(&mut self) -> BridgeResult<HorizonPosition> {
        let (az_raw, alt_raw) = self.get_position(GET_ALT_AZ, "get_alt_az")?;
        Ok(HorizonPosition {
            alt: decode_mount_angle(alt_raw),
            az: decode_mount_angle(az_raw),
        })
    }
}
