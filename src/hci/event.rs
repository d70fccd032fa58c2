//! Borrowed views of inbound event payloads.
//!
//! Every struct here is a zero-copy view into the wire record handed to the dispatcher; sample
//! data stays borrowed until a report is assembled into an owned application event. Field order
//! matches the controller's record layout, all multi-byte fields little endian.

use crate::bytes::*;
use crate::hci::Status;
use crate::Error;

/// The number of IQ samples a single extended-report fragment can carry.
///
/// Every fragment except possibly the last carries exactly this many samples; the reassembly
/// offset is computed from the fragment index and this constant, so it is part of the wire
/// contract with the controller, not a tunable.
pub const MAX_SAMPLES_PER_FRAGMENT: usize = 96;

enum_with_unknown! {
    /// Size of a single I or Q value in an IQ report.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum SampleSize(u8) {
        Bits8 = 1,
        Bits16 = 2,
    }
}

bitflags::bitflags! {
    /// Sample control flags reported with extended IQ reports.
    ///
    /// An empty value means default filtering was applied.
    pub struct SampleCtrl: u8 {
        /// Raw RF samples, switching periods not filtered out.
        const RAW_RF = 0x01;
    }
}

/// A complete (non-fragmented) connection-oriented IQ report.
#[derive(Debug)]
pub struct ConnectionIq<'a> {
    pub conn_handle: u16,
    pub phy: u8,
    pub data_ch_index: u8,
    pub rssi: u16,
    pub rssi_antenna: u8,
    pub cte_type: u8,
    pub slot_duration: u8,
    pub packet_status: u8,
    pub conn_event: u16,
    /// Interleaved I/Q pairs, two bytes per sample.
    pub samples: &'a [i8],
}

impl<'a> FromBytes<'a> for ConnectionIq<'a> {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let conn_handle = bytes.read_u16_le()?;
        let phy = bytes.read_u8()?;
        let data_ch_index = bytes.read_u8()?;
        let rssi = bytes.read_u16_le()?;
        let rssi_antenna = bytes.read_u8()?;
        let cte_type = bytes.read_u8()?;
        let slot_duration = bytes.read_u8()?;
        let packet_status = bytes.read_u8()?;
        let conn_event = bytes.read_u16_le()?;
        let sample_count = bytes.read_u8()?;
        let samples = bytes.read_i8_slice(usize::from(sample_count) * 2)?;
        Ok(ConnectionIq {
            conn_handle,
            phy,
            data_ch_index,
            rssi,
            rssi_antenna,
            cte_type,
            slot_duration,
            packet_status,
            conn_event,
            samples,
        })
    }
}

/// A complete (non-fragmented) connectionless IQ report (periodic advertising).
#[derive(Debug)]
pub struct ConnectionlessIq<'a> {
    pub sync_handle: u16,
    pub channel_index: u8,
    pub rssi: u16,
    pub rssi_antenna: u8,
    pub cte_type: u8,
    pub slot_duration: u8,
    pub packet_status: u8,
    pub event_counter: u16,
    pub samples: &'a [i8],
}

impl<'a> FromBytes<'a> for ConnectionlessIq<'a> {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let sync_handle = bytes.read_u16_le()?;
        let channel_index = bytes.read_u8()?;
        let rssi = bytes.read_u16_le()?;
        let rssi_antenna = bytes.read_u8()?;
        let cte_type = bytes.read_u8()?;
        let slot_duration = bytes.read_u8()?;
        let packet_status = bytes.read_u8()?;
        let event_counter = bytes.read_u16_le()?;
        let sample_count = bytes.read_u8()?;
        let samples = bytes.read_i8_slice(usize::from(sample_count) * 2)?;
        Ok(ConnectionlessIq {
            sync_handle,
            channel_index,
            rssi,
            rssi_antenna,
            cte_type,
            slot_duration,
            packet_status,
            event_counter,
            samples,
        })
    }
}

/// One fragment of an extended connection-oriented IQ report.
#[derive(Debug)]
pub struct ConnectionIqFragment<'a> {
    /// Sample count of the whole logical report, across all fragments.
    pub total_data_len: u16,
    /// Index of this fragment within the logical report, starting at 0.
    pub event_index: u8,
    pub conn_handle: u16,
    pub phy: u8,
    pub data_ch_index: u8,
    pub rssi: u16,
    pub rssi_antenna: u8,
    pub cte_type: u8,
    pub slot_duration: u8,
    pub packet_status: u8,
    pub conn_event: u16,
    /// Sample count carried by this fragment.
    pub data_len: u8,
    pub sample_rate: u8,
    pub sample_size: SampleSize,
    pub sample_ctrl: SampleCtrl,
    pub samples: &'a [i8],
}

impl<'a> FromBytes<'a> for ConnectionIqFragment<'a> {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let total_data_len = bytes.read_u16_le()?;
        let event_index = bytes.read_u8()?;
        let conn_handle = bytes.read_u16_le()?;
        let phy = bytes.read_u8()?;
        let data_ch_index = bytes.read_u8()?;
        let rssi = bytes.read_u16_le()?;
        let rssi_antenna = bytes.read_u8()?;
        let cte_type = bytes.read_u8()?;
        let slot_duration = bytes.read_u8()?;
        let packet_status = bytes.read_u8()?;
        let conn_event = bytes.read_u16_le()?;
        let data_len = bytes.read_u8()?;
        let sample_rate = bytes.read_u8()?;
        let sample_size = SampleSize::from(bytes.read_u8()?);
        let sample_ctrl = SampleCtrl::from_bits_truncate(bytes.read_u8()?);
        let samples = bytes.read_i8_slice(usize::from(data_len) * 2)?;
        Ok(ConnectionIqFragment {
            total_data_len,
            event_index,
            conn_handle,
            phy,
            data_ch_index,
            rssi,
            rssi_antenna,
            cte_type,
            slot_duration,
            packet_status,
            conn_event,
            data_len,
            sample_rate,
            sample_size,
            sample_ctrl,
            samples,
        })
    }
}

/// One fragment of an extended connectionless IQ report.
#[derive(Debug)]
pub struct ConnectionlessIqFragment<'a> {
    pub total_data_len: u16,
    pub event_index: u8,
    pub sync_handle: u16,
    pub channel_index: u8,
    pub rssi: u16,
    pub rssi_antenna: u8,
    pub cte_type: u8,
    pub slot_duration: u8,
    pub packet_status: u8,
    pub event_counter: u16,
    pub data_len: u8,
    pub sample_rate: u8,
    pub sample_size: SampleSize,
    pub sample_ctrl: SampleCtrl,
    pub samples: &'a [i8],
}

impl<'a> FromBytes<'a> for ConnectionlessIqFragment<'a> {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let total_data_len = bytes.read_u16_le()?;
        let event_index = bytes.read_u8()?;
        let sync_handle = bytes.read_u16_le()?;
        let channel_index = bytes.read_u8()?;
        let rssi = bytes.read_u16_le()?;
        let rssi_antenna = bytes.read_u8()?;
        let cte_type = bytes.read_u8()?;
        let slot_duration = bytes.read_u8()?;
        let packet_status = bytes.read_u8()?;
        let event_counter = bytes.read_u16_le()?;
        let data_len = bytes.read_u8()?;
        let sample_rate = bytes.read_u8()?;
        let sample_size = SampleSize::from(bytes.read_u8()?);
        let sample_ctrl = SampleCtrl::from_bits_truncate(bytes.read_u8()?);
        let samples = bytes.read_i8_slice(usize::from(data_len) * 2)?;
        Ok(ConnectionlessIqFragment {
            total_data_len,
            event_index,
            sync_handle,
            channel_index,
            rssi,
            rssi_antenna,
            cte_type,
            slot_duration,
            packet_status,
            event_counter,
            data_len,
            sample_rate,
            sample_size,
            sample_ctrl,
            samples,
        })
    }
}

/// CTE Request Failed event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CteRequestFailed {
    pub status: Status,
    pub conn_handle: u16,
}

impl<'a> FromBytes<'a> for CteRequestFailed {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        Ok(CteRequestFailed {
            status: Status::from(bytes.read_u8()?),
            conn_handle: bytes.read_u16_le()?,
        })
    }
}

/// Return parameters of the Read Antenna Information command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AntennaInfo {
    pub status: Status,
    /// Bitfield of supported switching/sampling rates.
    pub switch_sampling_rates: u8,
    pub num_antennae: u8,
    pub max_switch_pattern_len: u8,
    pub max_cte_len: u8,
}

impl<'a> FromBytes<'a> for AntennaInfo {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        Ok(AntennaInfo {
            status: Status::from(bytes.read_u8()?),
            switch_sampling_rates: bytes.read_u8()?,
            num_antennae: bytes.read_u8()?,
            max_switch_pattern_len: bytes.read_u8()?,
            max_cte_len: bytes.read_u8()?,
        })
    }
}

/// Periodic Advertising Sync Established event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SyncEstablished {
    pub status: Status,
    pub sync_handle: u16,
    pub adv_sid: u8,
    pub addr_type: u8,
    pub addr: [u8; 6],
    pub phy: u8,
    /// Periodic advertising interval in 1.25 ms units.
    pub interval: u16,
    pub clock_accuracy: u8,
}

impl<'a> FromBytes<'a> for SyncEstablished {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        Ok(SyncEstablished {
            status: Status::from(bytes.read_u8()?),
            sync_handle: bytes.read_u16_le()?,
            adv_sid: bytes.read_u8()?,
            addr_type: bytes.read_u8()?,
            addr: bytes.read_array()?,
            phy: bytes.read_u8()?,
            interval: bytes.read_u16_le()?,
            clock_accuracy: bytes.read_u8()?,
        })
    }
}

/// Periodic Advertising Report event, payload borrowed from the wire record.
#[derive(Debug)]
pub struct AdvReport<'a> {
    pub sync_handle: u16,
    pub tx_power: i8,
    pub rssi: i8,
    pub cte_type: u8,
    pub data_status: u8,
    pub data: &'a [u8],
}

impl<'a> FromBytes<'a> for AdvReport<'a> {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let sync_handle = bytes.read_u16_le()?;
        let tx_power = bytes.read_i8()?;
        let rssi = bytes.read_i8()?;
        let cte_type = bytes.read_u8()?;
        let data_status = bytes.read_u8()?;
        let data_len = bytes.read_u8()?;
        let data = bytes.read_slice(usize::from(data_len))?;
        Ok(AdvReport {
            sync_handle,
            tx_power,
            rssi,
            cte_type,
            data_status,
            data,
        })
    }
}

/// Periodic Advertising Sync Lost event.
#[derive(Debug, Copy, Clone)]
pub struct SyncLost {
    pub sync_handle: u16,
}

impl<'a> FromBytes<'a> for SyncLost {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        Ok(SyncLost {
            sync_handle: bytes.read_u16_le()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<'a, T: FromBytes<'a>>(raw: &'a [u8]) -> Result<T, Error> {
        let mut bytes = ByteReader::new(raw);
        let v = T::from_bytes(&mut bytes)?;
        assert!(bytes.is_empty(), "decode left {} bytes", bytes.bytes_left());
        Ok(v)
    }

    #[test]
    fn connection_iq() {
        #[rustfmt::skip]
        let raw = [
            0x05, 0x00,             // conn_handle
            0x01,                   // phy
            0x0c,                   // data_ch_index
            0xc8, 0x00,             // rssi
            0x00,                   // rssi_antenna
            0x00,                   // cte_type
            0x01,                   // slot_duration
            0x00,                   // packet_status
            0x2a, 0x00,             // conn_event
            0x02,                   // sample_count
            0x01, 0xff, 0x02, 0xfe, // samples
        ];
        let iq: ConnectionIq<'_> = decode(&raw).unwrap();
        assert_eq!(iq.conn_handle, 5);
        assert_eq!(iq.conn_event, 42);
        assert_eq!(iq.samples, &[1, -1, 2, -2]);
    }

    #[test]
    fn fragment_header() {
        #[rustfmt::skip]
        let raw = [
            0x60, 0x00,             // total_data_len = 96
            0x00,                   // event_index
            0x03, 0x10,             // sync_handle
            0x05,                   // channel_index
            0xb4, 0x00,             // rssi
            0x01,                   // rssi_antenna
            0x00,                   // cte_type
            0x02,                   // slot_duration
            0x00,                   // packet_status
            0x07, 0x00,             // event_counter
            0x01,                   // data_len
            0x04,                   // sample_rate
            0x02,                   // sample_size (16 bit)
            0x01,                   // sample_ctrl (RAW_RF)
            0x11, 0x22,             // samples
        ];
        let frag: ConnectionlessIqFragment<'_> = decode(&raw).unwrap();
        assert_eq!(frag.total_data_len, 96);
        assert_eq!(frag.sync_handle, 0x1003);
        assert_eq!(frag.sample_size, SampleSize::Bits16);
        assert_eq!(frag.sample_ctrl, SampleCtrl::RAW_RF);
        assert_eq!(frag.samples.len(), 2);
    }

    #[test]
    fn truncated_report_is_rejected() {
        // sample_count says 4 samples but only one byte follows
        let raw = [
            0x05, 0x00, 0x01, 0x0c, 0xc8, 0x00, 0x00, 0x00, 0x01, 0x00, 0x2a, 0x00, 0x04, 0x01,
        ];
        let r: Result<ConnectionIq<'_>, _> = decode(&raw);
        assert_eq!(r.unwrap_err(), Error::Eof);
    }
}
