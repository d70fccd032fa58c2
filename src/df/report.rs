//! Owned application events and the uniform error report.
//!
//! Everything the application receives is one of the [`DfEvent`] variants. Unlike the wire
//! records they are built from, these are self-contained: IQ sample data and periodic
//! advertising payloads are owned by the event, so the handler may keep them for as long as it
//! likes.

use crate::hci::event::{AntennaInfo, CteRequestFailed, SampleCtrl, SampleSize, SyncEstablished};
use crate::hci::{CommandOpcode, Status};
use crate::utils::Hex;
use crate::Error;
use heapless::consts::{U2048, U256};
use heapless::Vec;

/// Owned IQ sample storage.
///
/// 2048 bytes of interleaved I/Q data cover 1024 samples, enough for 4 MHz raw sampling of a
/// maximum-length CTE.
pub type SampleBuf = Vec<i8, U2048>;

/// Owned periodic advertising report payload.
pub type AdvDataBuf = Vec<u8, U256>;

/// Sentinel handle used in error reports for commands with no associated handle.
pub const HANDLE_NONE: u16 = 0xFFFF;

/// Cause codes for conditions this layer detects itself, distinguished from verbatim wire
/// status codes by the `0x01` high byte.
pub const CAUSE_BAD_PARAMETER: u16 = 0x0112;
pub const CAUSE_OUT_OF_MEMORY: u16 = 0x0107;

/// A command failure, surfaced to the application in a uniform shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Opcode of the originating command.
    pub opcode: Hex<u16>,
    /// Wire status code, or one of the synthetic `CAUSE_*` codes.
    pub cause: Hex<u16>,
    /// Associated handle, or `HANDLE_NONE`.
    pub handle: u16,
}

impl ErrorReport {
    /// Maps a command-complete status onto an error report.
    ///
    /// Returns `None` for success; wire status codes are forwarded verbatim.
    pub fn from_status(opcode: CommandOpcode, status: Status, handle: u16) -> Option<Self> {
        if status.is_success() {
            None
        } else {
            Some(ErrorReport {
                opcode: Hex(opcode.into()),
                cause: Hex(u16::from(u8::from(status))),
                handle,
            })
        }
    }

    /// Builds an error report for a failure detected locally, before the controller ever saw
    /// the command.
    pub fn local(opcode: CommandOpcode, error: &Error, handle: u16) -> Self {
        let cause = match error {
            Error::Memory => CAUSE_OUT_OF_MEMORY,
            _ => CAUSE_BAD_PARAMETER,
        };
        ErrorReport {
            opcode: Hex(opcode.into()),
            cause: Hex(cause),
            handle,
        }
    }
}

/// A reassembled, connection-oriented IQ report.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionIqReport {
    pub conn_handle: u16,
    pub phy: u8,
    pub data_ch_index: u8,
    pub rssi: u16,
    pub rssi_antenna: u8,
    pub cte_type: u8,
    pub slot_duration: u8,
    pub packet_status: u8,
    pub conn_event: u16,
    pub sample_rate: u8,
    pub sample_size: SampleSize,
    pub sample_ctrl: SampleCtrl,
    /// Length of the antenna switching pattern in effect.
    pub num_ant: u8,
    /// Number of IQ samples in `samples` (a 16-bit sample spans two buffer entries).
    pub sample_count: u16,
    pub samples: SampleBuf,
}

/// A reassembled, connectionless IQ report (periodic advertising).
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionlessIqReport {
    pub sync_handle: u16,
    pub channel_index: u8,
    pub rssi: u16,
    pub rssi_antenna: u8,
    pub cte_type: u8,
    pub slot_duration: u8,
    pub packet_status: u8,
    pub event_counter: u16,
    pub sample_rate: u8,
    pub sample_size: SampleSize,
    pub sample_ctrl: SampleCtrl,
    pub num_ant: u8,
    pub sample_count: u16,
    pub samples: SampleBuf,
}

/// A periodic advertising report with its payload copied out of the wire record.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicAdvReport {
    pub sync_handle: u16,
    pub tx_power: i8,
    pub rssi: i8,
    pub cte_type: u8,
    pub data_status: u8,
    pub data: AdvDataBuf,
}

/// A translated event, delivered to the registered application handler.
#[derive(Debug, Clone, PartialEq)]
pub enum DfEvent {
    ConnectionIqReport(ConnectionIqReport),
    ConnectionlessIqReport(ConnectionlessIqReport),
    AntennaInfo(AntennaInfo),
    CteRequestFailed(CteRequestFailed),
    /// A tracked command failed; see [`ErrorReport`].
    Error(ErrorReport),
    /// Positive or negative acknowledgment of a connectionless CTE transmit command.
    ClCommandComplete { opcode: Hex<u16>, status: Status },
    /// Acknowledgment of Set Connectionless IQ Sampling Enable, reported for every status.
    ClAoaEnableComplete { status: Status, sync_handle: u16 },
    PeriodicAdvListSize { size: u8 },
    SyncEstablished(SyncEstablished),
    SyncLost { sync_handle: u16 },
    PeriodicAdvReport(PeriodicAdvReport),
    TerminateSyncComplete { status: Status },
}
