//! HCI-level constants and wire formats for the direction-finding event family.
//!
//! The controller identifies events by a one-byte event code. The periodic-advertising family
//! is delivered through a separate sub-header with its own code space ([`SubEventCode`]), and
//! command completes are identified by the 16-bit opcode of the originating command.

pub mod command;
pub mod event;

enum_with_unknown! {
    /// Event codes of the CTE/IQ-report event family.
    ///
    /// `0x15`-`0x17` are the standard LE meta sub-event codes; the extended report codes are
    /// vendor-specific records the controller emits when one IQ sample buffer does not fit a
    /// single transport frame.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum EventCode(u8) {
        ConnectionlessIqReport = 0x15,
        ConnectionIqReport = 0x16,
        CteRequestFailed = 0x17,
        ExtConnectionIqReport = 0x82,
        ExtConnectionlessIqReport = 0x83,
    }
}

enum_with_unknown! {
    /// Event codes of the periodic-advertising sync family, carried in its own sub-header.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum SubEventCode(u8) {
        SyncEstablished = 0x0E,
        AdvReport = 0x0F,
        SyncLost = 0x10,
    }
}

enum_with_unknown! {
    /// Opcodes of the direction-finding and periodic-advertising commands this layer tracks.
    ///
    /// Values are the full OGF/OCF words from the Bluetooth 5.1 LE controller command group.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum CommandOpcode(u16) {
        PeriodicAdvCreateSync = 0x2044,
        PeriodicAdvCreateSyncCancel = 0x2045,
        PeriodicAdvTerminateSync = 0x2046,
        AddDeviceToPeriodicAdvList = 0x2047,
        RemoveDeviceFromPeriodicAdvList = 0x2048,
        ClearPeriodicAdvList = 0x2049,
        ReadPeriodicAdvListSize = 0x204A,
        SetConnectionlessCteTransmitParams = 0x2051,
        SetConnectionlessCteTransmitEnable = 0x2052,
        SetConnectionlessIqSamplingEnable = 0x2053,
        SetConnectionCteReceiveParams = 0x2054,
        SetConnectionCteTransmitParams = 0x2055,
        ConnectionCteRequestEnable = 0x2056,
        ConnectionCteResponseEnable = 0x2057,
        ReadAntennaInformation = 0x2058,
        SetPeriodicAdvReceiveEnable = 0x2059,
    }
}

enum_with_unknown! {
    /// HCI status codes reported in command-complete and command-status records.
    ///
    /// Only the codes this layer inspects or forwards get a named variant; everything else is
    /// passed through as `Unknown` (status values are forwarded to the application verbatim).
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum Status(u8) {
        Success = 0x00,
        UnknownConnectionId = 0x02,
        MemoryCapacityExceeded = 0x07,
        CommandDisallowed = 0x0C,
        UnsupportedFeature = 0x11,
        InvalidParameters = 0x12,
        UnknownAdvertisingIdentifier = 0x42,
        LimitReached = 0x43,
    }
}

impl Status {
    /// Returns whether this status signals command success.
    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }
}
