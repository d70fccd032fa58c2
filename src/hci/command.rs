//! Direction-finding command parameter blocks and the downstream transport seam.
//!
//! The layer issues configuration commands to the controller but does not care how they get
//! there; implement [`CommandTransport`] for whatever carries HCI command packets in your
//! system. Commands are encoded as `opcode (u16 LE) | parameter length (u8) | parameters`.

use crate::bytes::*;
use crate::hci::CommandOpcode;
use crate::Error;
use byteorder::{ByteOrder, LittleEndian};

/// Upper bound on an encoded command packet: the 3-byte header plus the largest parameter
/// block, which is connectionless sampling enable (6 fixed bytes) carrying a full antenna
/// switching pattern.
pub const MAX_COMMAND_LEN: usize = 3 + 6 + MAX_SWITCH_PATTERN_LEN;

/// Longest antenna switching pattern a command may carry (BT 5.1 limit).
pub const MAX_SWITCH_PATTERN_LEN: usize = 75;

/// Submits encoded HCI command packets to the link-layer controller.
///
/// The command-response round trip itself is not handled here; the controller's
/// command-complete records come back through the event entry points of
/// [`DfHost`](crate::df::DfHost).
pub trait CommandTransport {
    /// Hands one encoded command packet to the controller.
    fn submit(&mut self, command: &[u8]) -> Result<(), Error>;
}

/// Encodes `opcode` and `params` into `buf`, returning the encoded length.
pub(crate) fn encode<P: ToBytes>(
    opcode: CommandOpcode,
    params: &P,
    buf: &mut [u8],
) -> Result<usize, Error> {
    if buf.len() < 3 {
        return Err(Error::Eof);
    }
    let (header, rest) = buf.split_at_mut(3);
    let mut writer = ByteWriter::new(rest);
    let space = writer.space_left();
    params.to_bytes(&mut writer)?;
    let used = space - writer.space_left();

    LittleEndian::write_u16(header, opcode.into());
    header[2] = used as u8;
    Ok(3 + used)
}

/// Writes an antenna switching pattern as `length | antenna ids`.
fn write_switch_pattern(pattern: &[u8], writer: &mut ByteWriter<'_>) -> Result<(), Error> {
    if pattern.len() > MAX_SWITCH_PATTERN_LEN {
        return Err(Error::InvalidValue);
    }
    writer.write_u8(pattern.len() as u8)?;
    writer.write_slice(pattern)
}

impl ToBytes for () {
    fn to_bytes(&self, _writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        Ok(())
    }
}

/// Parameters of LE Set Connectionless IQ Sampling Enable.
pub struct ConnectionlessIqSamplingEnable<'a> {
    pub sync_handle: u16,
    pub enable: bool,
    pub slot_durations: u8,
    pub max_sampled_ctes: u8,
    /// Antenna ids to switch through; its length is the antenna-pattern length remembered for
    /// this sync handle.
    pub switch_pattern: &'a [u8],
}

impl ToBytes for ConnectionlessIqSamplingEnable<'_> {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.sync_handle)?;
        writer.write_u8(self.enable as u8)?;
        writer.write_u8(self.slot_durations)?;
        writer.write_u8(self.max_sampled_ctes)?;
        write_switch_pattern(self.switch_pattern, writer)
    }
}

/// Parameters of LE Set Connection CTE Receive Parameters.
pub struct ConnectionCteReceiveParams<'a> {
    pub conn_handle: u16,
    pub sampling_enable: bool,
    pub slot_durations: u8,
    pub switch_pattern: &'a [u8],
}

impl ToBytes for ConnectionCteReceiveParams<'_> {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.conn_handle)?;
        writer.write_u8(self.sampling_enable as u8)?;
        writer.write_u8(self.slot_durations)?;
        write_switch_pattern(self.switch_pattern, writer)
    }
}

/// Parameters of LE Set Connection CTE Transmit Parameters.
pub struct ConnectionCteTransmitParams<'a> {
    pub conn_handle: u16,
    /// Bitfield of permitted CTE types.
    pub cte_types: u8,
    pub switch_pattern: &'a [u8],
}

impl ToBytes for ConnectionCteTransmitParams<'_> {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.conn_handle)?;
        writer.write_u8(self.cte_types)?;
        write_switch_pattern(self.switch_pattern, writer)
    }
}

/// Parameters of LE Connection CTE Request Enable.
pub struct ConnectionCteRequestEnable {
    pub conn_handle: u16,
    pub enable: bool,
    /// Request interval in connection events.
    pub interval: u16,
    pub requested_cte_length: u8,
    pub requested_cte_type: u8,
}

impl ToBytes for ConnectionCteRequestEnable {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.conn_handle)?;
        writer.write_u8(self.enable as u8)?;
        writer.write_u16_le(self.interval)?;
        writer.write_u8(self.requested_cte_length)?;
        writer.write_u8(self.requested_cte_type)
    }
}

/// Parameters of LE Connection CTE Response Enable.
pub struct ConnectionCteResponseEnable {
    pub conn_handle: u16,
    pub enable: bool,
}

impl ToBytes for ConnectionCteResponseEnable {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.conn_handle)?;
        writer.write_u8(self.enable as u8)
    }
}

/// Parameters of LE Set Connectionless CTE Transmit Parameters.
pub struct ConnectionlessCteTransmitParams<'a> {
    pub adv_handle: u8,
    pub cte_length: u8,
    pub cte_type: u8,
    /// CTEs to transmit per periodic advertising event.
    pub cte_count: u8,
    pub switch_pattern: &'a [u8],
}

impl ToBytes for ConnectionlessCteTransmitParams<'_> {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u8(self.adv_handle)?;
        writer.write_u8(self.cte_length)?;
        writer.write_u8(self.cte_type)?;
        writer.write_u8(self.cte_count)?;
        write_switch_pattern(self.switch_pattern, writer)
    }
}

/// Parameters of LE Set Connectionless CTE Transmit Enable.
pub struct ConnectionlessCteTransmitEnable {
    pub adv_handle: u8,
    pub enable: bool,
}

impl ToBytes for ConnectionlessCteTransmitEnable {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u8(self.adv_handle)?;
        writer.write_u8(self.enable as u8)
    }
}

/// Parameters of LE Periodic Advertising Create Sync.
pub struct PeriodicAdvCreateSync {
    pub options: u8,
    pub adv_sid: u8,
    pub addr_type: u8,
    pub addr: [u8; 6],
    /// Periodic advertising events that may be skipped.
    pub skip: u16,
    /// Sync supervision timeout in 10 ms units.
    pub sync_timeout: u16,
    pub sync_cte_type: u8,
}

impl ToBytes for PeriodicAdvCreateSync {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u8(self.options)?;
        writer.write_u8(self.adv_sid)?;
        writer.write_u8(self.addr_type)?;
        writer.write_slice(&self.addr)?;
        writer.write_u16_le(self.skip)?;
        writer.write_u16_le(self.sync_timeout)?;
        writer.write_u8(self.sync_cte_type)
    }
}

/// Parameters of LE Periodic Advertising Terminate Sync.
pub struct PeriodicAdvTerminateSync {
    pub sync_handle: u16,
}

impl ToBytes for PeriodicAdvTerminateSync {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.sync_handle)
    }
}

/// Parameters of the periodic advertiser list add/remove commands.
pub struct PeriodicAdvListDevice {
    pub addr_type: u8,
    pub addr: [u8; 6],
    pub adv_sid: u8,
}

impl ToBytes for PeriodicAdvListDevice {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u8(self.addr_type)?;
        writer.write_slice(&self.addr)?;
        writer.write_u8(self.adv_sid)
    }
}

/// Parameters of LE Set Periodic Advertising Receive Enable.
pub struct PeriodicAdvReceiveEnable {
    pub sync_handle: u16,
    pub enable: bool,
}

impl ToBytes for PeriodicAdvReceiveEnable {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_le(self.sync_handle)?;
        writer.write_u8(self.enable as u8)
    }
}
