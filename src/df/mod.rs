//! The direction-finding host: event translation, reassembly and command issue.
//!
//! [`DfHost`] sits between the HCI transport and the application. Inbound controller records
//! enter through [`DfHost::hci_event`], [`DfHost::command_complete`] and
//! [`DfHost::periodic_adv_event`]; translated events leave through the registered
//! [`EventHandler`]. Outbound commands are issued through the wrapper methods and submitted to
//! the [`CommandTransport`] the host was built with.
//!
//! Processing is run-to-completion: every entry point translates (or discards) its record
//! before returning, and reports its [`Disposition`] so the transport layer knows what became
//! of the buffer it handed in.

pub mod registry;
pub mod report;

mod reassembly;

use self::reassembly::{Feed, Session};
use self::registry::AntennaRegistry;
use self::report::*;
use crate::bytes::{ByteReader, FromBytes, ToBytes};
use crate::hci::command::{self, CommandTransport, MAX_COMMAND_LEN};
use crate::hci::event::{self, SampleCtrl, SampleSize};
use crate::hci::{CommandOpcode, EventCode, Status, SubEventCode};
use crate::utils::Hex;
use crate::Error;

/// What became of an inbound record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Translated and handed to the application handler.
    Delivered,
    /// Consumed without a delivery (a stored fragment, or a silent command success).
    Absorbed,
    /// Discarded because it was malformed, out of sequence, or memory ran out.
    Dropped,
    /// Not addressed to this layer, or no handler is registered.
    Ignored,
}

/// A 16-bit sample spans two of the raw sample slots the wire length fields count.
fn reported_samples(total: u16, size: SampleSize) -> u16 {
    match size {
        SampleSize::Bits16 => total / 2,
        _ => total,
    }
}

/// Receives translated [`DfEvent`]s.
///
/// Implemented for any `FnMut(DfEvent)` closure.
pub trait EventHandler {
    fn handle(&mut self, event: DfEvent);
}

impl<F: FnMut(DfEvent)> EventHandler for F {
    fn handle(&mut self, event: DfEvent) {
        self(event)
    }
}

/// Direction-finding host instance.
///
/// `C` carries encoded command packets to the controller; `H` receives translated events. The
/// host is single-threaded: all entry points must be called from the same context.
pub struct DfHost<C: CommandTransport, H: EventHandler> {
    transport: C,
    handler: Option<H>,
    registry: AntennaRegistry,
    conn_session: Session<ConnectionIqReport>,
    cl_session: Session<ConnectionlessIqReport>,
    /// Antenna-pattern length of the most recent connection CTE receive configuration.
    current_num_ant: u8,
    /// Sync handle of an in-flight terminate-sync command.
    pending_terminate: Option<u16>,
}

impl<C: CommandTransport, H: EventHandler> DfHost<C, H> {
    pub fn new(transport: C) -> Self {
        Self {
            transport,
            handler: None,
            registry: AntennaRegistry::new(),
            conn_session: Session::new(),
            cl_session: Session::new(),
            current_num_ant: 0,
            pending_terminate: None,
        }
    }

    /// Registers the application handler. Replaces any previous one.
    pub fn register_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    /// Unregisters the handler; inbound records are ignored until a new one is registered.
    pub fn clear_handler(&mut self) -> Option<H> {
        self.handler.take()
    }

    fn deliver(&mut self, event: DfEvent) -> Disposition {
        match self.handler.as_mut() {
            Some(handler) => {
                handler.handle(event);
                Disposition::Delivered
            }
            None => Disposition::Ignored,
        }
    }

    /// Processes an LE meta event of the CTE/IQ-report family.
    ///
    /// `code` is the sub-event code, `payload` the bytes following it.
    pub fn hci_event(&mut self, code: u8, payload: &[u8]) -> Disposition {
        if self.handler.is_none() || payload.is_empty() {
            return Disposition::Ignored;
        }
        let mut bytes = ByteReader::new(payload);
        match EventCode::from(code) {
            EventCode::ConnectionIqReport => match event::ConnectionIq::from_bytes(&mut bytes) {
                Ok(iq) => self.connection_iq(&iq),
                Err(e) => self.malformed(code, e),
            },
            EventCode::ConnectionlessIqReport => {
                match event::ConnectionlessIq::from_bytes(&mut bytes) {
                    Ok(iq) => self.connectionless_iq(&iq),
                    Err(e) => self.malformed(code, e),
                }
            }
            EventCode::CteRequestFailed => match event::CteRequestFailed::from_bytes(&mut bytes) {
                Ok(ev) => self.deliver(DfEvent::CteRequestFailed(ev)),
                Err(e) => self.malformed(code, e),
            },
            EventCode::ExtConnectionIqReport => {
                match event::ConnectionIqFragment::from_bytes(&mut bytes) {
                    Ok(frag) => self.connection_fragment(&frag),
                    Err(e) => self.malformed(code, e),
                }
            }
            EventCode::ExtConnectionlessIqReport => {
                match event::ConnectionlessIqFragment::from_bytes(&mut bytes) {
                    Ok(frag) => self.connectionless_fragment(&frag),
                    Err(e) => self.malformed(code, e),
                }
            }
            EventCode::Unknown(_) => Disposition::Ignored,
        }
    }

    fn malformed(&mut self, code: u8, error: Error) -> Disposition {
        warn!("malformed event {:02x}: {}", code, error);
        Disposition::Dropped
    }

    fn connection_iq(&mut self, iq: &event::ConnectionIq<'_>) -> Disposition {
        let mut samples = SampleBuf::new();
        if samples.extend_from_slice(iq.samples).is_err() {
            return Disposition::Dropped;
        }
        self.deliver(DfEvent::ConnectionIqReport(ConnectionIqReport {
            conn_handle: iq.conn_handle,
            phy: iq.phy,
            data_ch_index: iq.data_ch_index,
            rssi: iq.rssi,
            rssi_antenna: iq.rssi_antenna,
            cte_type: iq.cte_type,
            slot_duration: iq.slot_duration,
            packet_status: iq.packet_status,
            conn_event: iq.conn_event,
            sample_rate: 1,
            sample_size: SampleSize::Bits8,
            sample_ctrl: SampleCtrl::empty(),
            num_ant: self.current_num_ant,
            sample_count: (iq.samples.len() / 2) as u16,
            samples,
        }))
    }

    fn connectionless_iq(&mut self, iq: &event::ConnectionlessIq<'_>) -> Disposition {
        // a report for a handle that was never enabled cannot be translated
        let num_ant = match self.registry.lookup(iq.sync_handle) {
            Some(num_ant) if num_ant != 0 => num_ant,
            _ => {
                trace!("no antenna pattern for sync handle {:04x}", iq.sync_handle);
                return Disposition::Dropped;
            }
        };
        let mut samples = SampleBuf::new();
        if samples.extend_from_slice(iq.samples).is_err() {
            return Disposition::Dropped;
        }
        self.deliver(DfEvent::ConnectionlessIqReport(ConnectionlessIqReport {
            sync_handle: iq.sync_handle,
            channel_index: iq.channel_index,
            rssi: iq.rssi,
            rssi_antenna: iq.rssi_antenna,
            cte_type: iq.cte_type,
            slot_duration: iq.slot_duration,
            packet_status: iq.packet_status,
            event_counter: iq.event_counter,
            sample_rate: 1,
            sample_size: SampleSize::Bits8,
            sample_ctrl: SampleCtrl::empty(),
            num_ant,
            sample_count: (iq.samples.len() / 2) as u16,
            samples,
        }))
    }

    fn connection_fragment(&mut self, frag: &event::ConnectionIqFragment<'_>) -> Disposition {
        let num_ant = self.current_num_ant;
        match self.conn_session.feed(frag, || {
            Ok(ConnectionIqReport {
                conn_handle: frag.conn_handle,
                phy: frag.phy,
                data_ch_index: frag.data_ch_index,
                rssi: frag.rssi,
                rssi_antenna: frag.rssi_antenna,
                cte_type: frag.cte_type,
                slot_duration: frag.slot_duration,
                packet_status: frag.packet_status,
                conn_event: frag.conn_event,
                sample_rate: frag.sample_rate,
                sample_size: frag.sample_size,
                sample_ctrl: frag.sample_ctrl,
                num_ant,
                sample_count: reported_samples(frag.total_data_len, frag.sample_size),
                samples: SampleBuf::new(),
            })
        }) {
            Feed::Absorbed => Disposition::Absorbed,
            Feed::Complete(report) => self.deliver(DfEvent::ConnectionIqReport(report)),
            Feed::Dropped => {
                trace!(
                    "dropped connection IQ fragment {} of handle {:04x}",
                    frag.event_index,
                    frag.conn_handle
                );
                Disposition::Dropped
            }
        }
    }

    fn connectionless_fragment(
        &mut self,
        frag: &event::ConnectionlessIqFragment<'_>,
    ) -> Disposition {
        let registry = &self.registry;
        match self.cl_session.feed(frag, || {
            let num_ant = match registry.lookup(frag.sync_handle) {
                Some(num_ant) if num_ant != 0 => num_ant,
                _ => return Err(Error::InvalidValue),
            };
            Ok(ConnectionlessIqReport {
                sync_handle: frag.sync_handle,
                channel_index: frag.channel_index,
                rssi: frag.rssi,
                rssi_antenna: frag.rssi_antenna,
                cte_type: frag.cte_type,
                slot_duration: frag.slot_duration,
                packet_status: frag.packet_status,
                event_counter: frag.event_counter,
                sample_rate: frag.sample_rate,
                sample_size: frag.sample_size,
                sample_ctrl: frag.sample_ctrl,
                num_ant,
                sample_count: reported_samples(frag.total_data_len, frag.sample_size),
                samples: SampleBuf::new(),
            })
        }) {
            Feed::Absorbed => Disposition::Absorbed,
            Feed::Complete(report) => self.deliver(DfEvent::ConnectionlessIqReport(report)),
            Feed::Dropped => {
                trace!(
                    "dropped connectionless IQ fragment {} of handle {:04x}",
                    frag.event_index,
                    frag.sync_handle
                );
                Disposition::Dropped
            }
        }
    }

    /// Processes a command-complete (or command-status) record.
    ///
    /// `payload` starts with the status byte, followed by the command's return parameters.
    pub fn command_complete(&mut self, opcode: u16, payload: &[u8]) -> Disposition {
        if self.handler.is_none() || payload.is_empty() {
            return Disposition::Ignored;
        }
        let mut bytes = ByteReader::new(payload);
        let opcode = CommandOpcode::from(opcode);
        match opcode {
            CommandOpcode::Unknown(_) => Disposition::Ignored,
            CommandOpcode::ReadAntennaInformation => {
                match event::AntennaInfo::from_bytes(&mut bytes) {
                    // a non-success status is not even worth an error report for this one
                    // command; only successful reads are translated
                    Ok(info) if info.status.is_success() => {
                        self.deliver(DfEvent::AntennaInfo(info))
                    }
                    Ok(_) => Disposition::Absorbed,
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
            CommandOpcode::SetConnectionlessIqSamplingEnable => {
                match self.read_status_and_handle(&mut bytes) {
                    Ok((status, sync_handle)) => {
                        if !status.is_success() {
                            self.registry.remove(sync_handle);
                        }
                        self.deliver(DfEvent::ClAoaEnableComplete {
                            status,
                            sync_handle,
                        })
                    }
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
            CommandOpcode::SetConnectionlessCteTransmitParams
            | CommandOpcode::SetConnectionlessCteTransmitEnable => {
                match bytes.read_u8() {
                    Ok(status) => self.deliver(DfEvent::ClCommandComplete {
                        opcode: Hex(opcode.into()),
                        status: Status::from(status),
                    }),
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
            CommandOpcode::SetConnectionCteReceiveParams
            | CommandOpcode::SetConnectionCteTransmitParams
            | CommandOpcode::ConnectionCteRequestEnable
            | CommandOpcode::ConnectionCteResponseEnable => {
                match self.read_status_and_handle(&mut bytes) {
                    Ok((status, conn_handle)) => {
                        self.complete_or_report(opcode, status, conn_handle)
                    }
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
            CommandOpcode::ReadPeriodicAdvListSize => {
                let parsed = bytes
                    .read_u8()
                    .map(Status::from)
                    .and_then(|status| Ok((status, bytes.read_u8()?)));
                match parsed {
                    Ok((status, size)) => {
                        if status.is_success() {
                            self.deliver(DfEvent::PeriodicAdvListSize { size })
                        } else {
                            self.complete_or_report(opcode, status, HANDLE_NONE)
                        }
                    }
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
            CommandOpcode::PeriodicAdvTerminateSync => {
                let handle = self.pending_terminate.take().unwrap_or(HANDLE_NONE);
                match bytes.read_u8().map(Status::from) {
                    Ok(status) => {
                        if status.is_success() {
                            self.registry.remove(handle);
                            self.deliver(DfEvent::TerminateSyncComplete { status })
                        } else {
                            self.complete_or_report(opcode, status, handle)
                        }
                    }
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
            CommandOpcode::PeriodicAdvCreateSync
            | CommandOpcode::PeriodicAdvCreateSyncCancel
            | CommandOpcode::AddDeviceToPeriodicAdvList
            | CommandOpcode::RemoveDeviceFromPeriodicAdvList
            | CommandOpcode::ClearPeriodicAdvList
            | CommandOpcode::SetPeriodicAdvReceiveEnable => {
                match bytes.read_u8().map(Status::from) {
                    Ok(status) => self.complete_or_report(opcode, status, HANDLE_NONE),
                    Err(e) => self.malformed_complete(opcode, e),
                }
            }
        }
    }

    fn read_status_and_handle(&mut self, bytes: &mut ByteReader<'_>) -> Result<(Status, u16), Error> {
        let status = Status::from(bytes.read_u8()?);
        let handle = bytes.read_u16_le()?;
        Ok((status, handle))
    }

    /// Delivers an error report on failure; success is consumed silently.
    fn complete_or_report(
        &mut self,
        opcode: CommandOpcode,
        status: Status,
        handle: u16,
    ) -> Disposition {
        match ErrorReport::from_status(opcode, status, handle) {
            Some(report) => self.deliver(DfEvent::Error(report)),
            None => Disposition::Absorbed,
        }
    }

    fn malformed_complete(&mut self, opcode: CommandOpcode, error: Error) -> Disposition {
        warn!("malformed command complete {:?}: {}", opcode, error);
        Disposition::Dropped
    }

    /// Processes a periodic-advertising sync event.
    pub fn periodic_adv_event(&mut self, code: u8, payload: &[u8]) -> Disposition {
        if self.handler.is_none() || payload.is_empty() {
            return Disposition::Ignored;
        }
        let mut bytes = ByteReader::new(payload);
        match SubEventCode::from(code) {
            SubEventCode::SyncEstablished => {
                match event::SyncEstablished::from_bytes(&mut bytes) {
                    Ok(ev) => self.deliver(DfEvent::SyncEstablished(ev)),
                    Err(e) => self.malformed(code, e),
                }
            }
            SubEventCode::AdvReport => match event::AdvReport::from_bytes(&mut bytes) {
                Ok(report) => {
                    let mut data = AdvDataBuf::new();
                    if data.extend_from_slice(report.data).is_err() {
                        return Disposition::Dropped;
                    }
                    self.deliver(DfEvent::PeriodicAdvReport(PeriodicAdvReport {
                        sync_handle: report.sync_handle,
                        tx_power: report.tx_power,
                        rssi: report.rssi,
                        cte_type: report.cte_type,
                        data_status: report.data_status,
                        data,
                    }))
                }
                Err(e) => self.malformed(code, e),
            },
            SubEventCode::SyncLost => match event::SyncLost::from_bytes(&mut bytes) {
                Ok(ev) => {
                    // the train is gone: forget its pattern and any partial report
                    self.registry.remove(ev.sync_handle);
                    self.cl_session.reset();
                    self.deliver(DfEvent::SyncLost {
                        sync_handle: ev.sync_handle,
                    })
                }
                Err(e) => self.malformed(code, e),
            },
            SubEventCode::Unknown(_) => Disposition::Ignored,
        }
    }

    fn submit<P: ToBytes>(
        &mut self,
        opcode: CommandOpcode,
        params: &P,
        handle: u16,
    ) -> Result<(), Error> {
        let mut buf = [0; MAX_COMMAND_LEN];
        let result = command::encode(opcode, params, &mut buf).and_then(|len| {
            self.transport.submit(&buf[..len])?;
            debug!("submitted {:?} ({} bytes)", opcode, len);
            Ok(())
        });
        if let Err(e) = &result {
            self.deliver(DfEvent::Error(ErrorReport::local(opcode, e, handle)));
        }
        result
    }

    /// Issues LE Set Connectionless IQ Sampling Enable.
    ///
    /// On enable, the length of `params.switch_pattern` is recorded for the sync handle so
    /// subsequent connectionless reports can carry it.
    pub fn set_connectionless_iq_sampling_enable(
        &mut self,
        params: &command::ConnectionlessIqSamplingEnable<'_>,
    ) -> Result<(), Error> {
        let opcode = CommandOpcode::SetConnectionlessIqSamplingEnable;
        if params.enable {
            let num_ant = params.switch_pattern.len() as u8;
            if let Err(e) = self.registry.upsert(params.sync_handle, num_ant) {
                self.deliver(DfEvent::Error(ErrorReport::local(
                    opcode,
                    &e,
                    params.sync_handle,
                )));
                return Err(e);
            }
        }
        let result = self.submit(opcode, params, params.sync_handle);
        if result.is_err() && params.enable {
            // the command never went out, so no pattern was negotiated
            self.registry.remove(params.sync_handle);
        }
        result
    }

    /// Issues LE Set Connection CTE Receive Parameters.
    ///
    /// On enable, the pattern length becomes the antenna count reported with subsequent
    /// connection IQ reports.
    pub fn set_connection_cte_receive_params(
        &mut self,
        params: &command::ConnectionCteReceiveParams<'_>,
    ) -> Result<(), Error> {
        if params.sampling_enable {
            self.current_num_ant = params.switch_pattern.len() as u8;
        }
        self.submit(
            CommandOpcode::SetConnectionCteReceiveParams,
            params,
            params.conn_handle,
        )
    }

    /// Issues LE Set Connection CTE Transmit Parameters.
    pub fn set_connection_cte_transmit_params(
        &mut self,
        params: &command::ConnectionCteTransmitParams<'_>,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::SetConnectionCteTransmitParams,
            params,
            params.conn_handle,
        )
    }

    /// Issues LE Connection CTE Request Enable.
    pub fn connection_cte_request_enable(
        &mut self,
        params: &command::ConnectionCteRequestEnable,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::ConnectionCteRequestEnable,
            params,
            params.conn_handle,
        )
    }

    /// Issues LE Connection CTE Response Enable.
    pub fn connection_cte_response_enable(
        &mut self,
        params: &command::ConnectionCteResponseEnable,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::ConnectionCteResponseEnable,
            params,
            params.conn_handle,
        )
    }

    /// Issues LE Set Connectionless CTE Transmit Parameters.
    pub fn set_connectionless_cte_transmit_params(
        &mut self,
        params: &command::ConnectionlessCteTransmitParams<'_>,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::SetConnectionlessCteTransmitParams,
            params,
            HANDLE_NONE,
        )
    }

    /// Issues LE Set Connectionless CTE Transmit Enable.
    pub fn set_connectionless_cte_transmit_enable(
        &mut self,
        params: &command::ConnectionlessCteTransmitEnable,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::SetConnectionlessCteTransmitEnable,
            params,
            HANDLE_NONE,
        )
    }

    /// Issues LE Read Antenna Information.
    pub fn read_antenna_information(&mut self) -> Result<(), Error> {
        self.submit(CommandOpcode::ReadAntennaInformation, &(), HANDLE_NONE)
    }

    /// Issues LE Periodic Advertising Create Sync.
    pub fn periodic_adv_create_sync(
        &mut self,
        params: &command::PeriodicAdvCreateSync,
    ) -> Result<(), Error> {
        self.submit(CommandOpcode::PeriodicAdvCreateSync, params, HANDLE_NONE)
    }

    /// Issues LE Periodic Advertising Create Sync Cancel.
    pub fn periodic_adv_create_sync_cancel(&mut self) -> Result<(), Error> {
        self.submit(CommandOpcode::PeriodicAdvCreateSyncCancel, &(), HANDLE_NONE)
    }

    /// Issues LE Periodic Advertising Terminate Sync.
    ///
    /// On success (reported through [`DfHost::command_complete`]) the handle's antenna-pattern
    /// entry is dropped.
    pub fn periodic_adv_terminate_sync(
        &mut self,
        params: &command::PeriodicAdvTerminateSync,
    ) -> Result<(), Error> {
        self.pending_terminate = Some(params.sync_handle);
        self.submit(
            CommandOpcode::PeriodicAdvTerminateSync,
            params,
            params.sync_handle,
        )
    }

    /// Issues LE Add Device To Periodic Advertiser List.
    pub fn add_device_to_periodic_adv_list(
        &mut self,
        params: &command::PeriodicAdvListDevice,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::AddDeviceToPeriodicAdvList,
            params,
            HANDLE_NONE,
        )
    }

    /// Issues LE Remove Device From Periodic Advertiser List.
    pub fn remove_device_from_periodic_adv_list(
        &mut self,
        params: &command::PeriodicAdvListDevice,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::RemoveDeviceFromPeriodicAdvList,
            params,
            HANDLE_NONE,
        )
    }

    /// Issues LE Clear Periodic Advertiser List.
    pub fn clear_periodic_adv_list(&mut self) -> Result<(), Error> {
        self.submit(CommandOpcode::ClearPeriodicAdvList, &(), HANDLE_NONE)
    }

    /// Issues LE Read Periodic Advertiser List Size.
    pub fn read_periodic_adv_list_size(&mut self) -> Result<(), Error> {
        self.submit(CommandOpcode::ReadPeriodicAdvListSize, &(), HANDLE_NONE)
    }

    /// Issues LE Set Periodic Advertising Receive Enable.
    pub fn set_periodic_adv_receive_enable(
        &mut self,
        params: &command::PeriodicAdvReceiveEnable,
    ) -> Result<(), Error> {
        self.submit(
            CommandOpcode::SetPeriodicAdvReceiveEnable,
            params,
            params.sync_handle,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hci::event::MAX_SAMPLES_PER_FRAGMENT;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    type Events = Rc<RefCell<Vec<DfEvent>>>;

    struct Loopback {
        commands: Rc<RefCell<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl CommandTransport for Loopback {
        fn submit(&mut self, command: &[u8]) -> Result<(), Error> {
            if self.fail {
                return Err(Error::Memory);
            }
            self.commands.borrow_mut().push(command.to_vec());
            Ok(())
        }
    }

    fn host(fail: bool) -> (DfHost<Loopback, impl EventHandler>, Events, Rc<RefCell<Vec<Vec<u8>>>>) {
        let events: Events = Rc::new(RefCell::new(Vec::new()));
        let commands = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let mut host = DfHost::new(Loopback {
            commands: commands.clone(),
            fail,
        });
        host.register_handler(move |event| sink.borrow_mut().push(event));
        (host, events, commands)
    }

    /// Encodes a connectionless extended-report fragment the way the controller does.
    fn cl_fragment_bytes(index: u8, total: u16, sync_handle: u16, samples: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&total.to_le_bytes());
        raw.push(index);
        raw.extend_from_slice(&sync_handle.to_le_bytes());
        raw.push(5); // channel_index
        raw.extend_from_slice(&0xb4u16.to_le_bytes()); // rssi
        raw.push(0); // rssi_antenna
        raw.push(0); // cte_type
        raw.push(2); // slot_duration
        raw.push(0); // packet_status
        raw.extend_from_slice(&7u16.to_le_bytes()); // event_counter
        raw.push((samples.len() / 2) as u8);
        raw.push(1); // sample_rate
        raw.push(1); // sample_size (8 bit)
        raw.push(0); // sample_ctrl
        raw.extend_from_slice(samples);
        raw
    }

    #[test]
    fn fragments_reassemble_end_to_end() {
        let (mut host, events, _) = host(false);
        host.set_connectionless_iq_sampling_enable(&command::ConnectionlessIqSamplingEnable {
            sync_handle: 0x0003,
            enable: true,
            slot_durations: 2,
            max_sampled_ctes: 0,
            switch_pattern: &[0, 1, 2, 3],
        })
        .unwrap();

        let total = (MAX_SAMPLES_PER_FRAGMENT + 4) as u16;
        let first = vec![0x11; MAX_SAMPLES_PER_FRAGMENT * 2];
        let second = vec![0x22; 8];

        let raw = cl_fragment_bytes(0, total, 0x0003, &first);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Absorbed);
        assert!(events.borrow().is_empty());

        let raw = cl_fragment_bytes(1, total, 0x0003, &second);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Delivered);

        let events = events.borrow();
        match &events[0] {
            DfEvent::ConnectionlessIqReport(iq) => {
                assert_eq!(iq.sync_handle, 0x0003);
                assert_eq!(iq.num_ant, 4);
                assert_eq!(iq.sample_count, total);
                assert_eq!(iq.samples.len(), usize::from(total) * 2);
                assert!(iq.samples[..first.len()].iter().all(|&s| s == 0x11));
                assert!(iq.samples[first.len()..].iter().all(|&s| s == 0x22));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn full_connectionless_report_resolves_pattern_until_sync_lost() {
        let (mut host, events, _) = host(false);
        host.set_connectionless_iq_sampling_enable(&command::ConnectionlessIqSamplingEnable {
            sync_handle: 0x0005,
            enable: true,
            slot_durations: 1,
            max_sampled_ctes: 0,
            switch_pattern: &[0, 1, 2, 3],
        })
        .unwrap();

        #[rustfmt::skip]
        let raw = [
            0x05, 0x00,             // sync_handle
            0x0c,                   // channel_index
            0xb4, 0x00,             // rssi
            0x00,                   // rssi_antenna
            0x00,                   // cte_type
            0x01,                   // slot_duration
            0x00,                   // packet_status
            0x2a, 0x00,             // event_counter
            0x02,                   // sample_count
            0x01, 0xff, 0x02, 0xfe, // samples
        ];
        assert_eq!(host.hci_event(0x15, &raw), Disposition::Delivered);
        match events.borrow().last().unwrap() {
            DfEvent::ConnectionlessIqReport(iq) => {
                assert_eq!(iq.sync_handle, 0x0005);
                assert_eq!(iq.num_ant, 4);
                assert_eq!(iq.sample_count, 2);
                assert_eq!(&iq.samples[..], &[1, -1, 2, -2]);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(
            host.periodic_adv_event(0x10, &[0x05, 0x00]),
            Disposition::Delivered
        );
        // without a registry entry the same report can no longer be translated
        assert_eq!(host.hci_event(0x15, &raw), Disposition::Dropped);
    }

    #[test]
    fn no_handler_or_empty_payload_is_ignored() {
        let (mut host, _, _) = host(false);
        assert_eq!(host.hci_event(0x16, &[]), Disposition::Ignored);

        host.clear_handler();
        let raw = cl_fragment_bytes(0, 4, 0x0003, &[0; 8]);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Ignored);
        assert_eq!(host.command_complete(0x2046, &[0x00]), Disposition::Ignored);
    }

    #[test]
    fn unknown_codes_are_ignored() {
        let (mut host, events, _) = host(false);
        assert_eq!(host.hci_event(0x42, &[0x00]), Disposition::Ignored);
        assert_eq!(host.command_complete(0x2001, &[0x00]), Disposition::Ignored);
        assert_eq!(host.periodic_adv_event(0x01, &[0x00]), Disposition::Ignored);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn command_failure_surfaces_as_error_report() {
        let (mut host, events, _) = host(false);
        // receive-params complete: status 0x12, conn handle 0x0005
        let d = host.command_complete(0x2054, &[0x12, 0x05, 0x00]);
        assert_eq!(d, Disposition::Delivered);
        assert_eq!(
            events.borrow()[0],
            DfEvent::Error(ErrorReport {
                opcode: Hex(0x2054),
                cause: Hex(0x0012),
                handle: 0x0005,
            })
        );

        // success is consumed silently
        let d = host.command_complete(0x2054, &[0x00, 0x05, 0x00]);
        assert_eq!(d, Disposition::Absorbed);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn terminate_sync_success_drops_registry_entry() {
        let (mut host, events, _) = host(false);
        host.set_connectionless_iq_sampling_enable(&command::ConnectionlessIqSamplingEnable {
            sync_handle: 0x0003,
            enable: true,
            slot_durations: 2,
            max_sampled_ctes: 0,
            switch_pattern: &[0, 1, 2],
        })
        .unwrap();
        host.periodic_adv_terminate_sync(&command::PeriodicAdvTerminateSync {
            sync_handle: 0x0003,
        })
        .unwrap();

        assert_eq!(host.command_complete(0x2046, &[0x00]), Disposition::Delivered);
        assert_eq!(
            *events.borrow().last().unwrap(),
            DfEvent::TerminateSyncComplete {
                status: Status::Success
            }
        );

        // a later report for the handle no longer resolves a pattern length
        let raw = cl_fragment_bytes(0, 4, 0x0003, &[0; 8]);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Dropped);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn failed_sampling_enable_complete_unregisters_pattern() {
        let (mut host, events, _) = host(false);
        host.set_connectionless_iq_sampling_enable(&command::ConnectionlessIqSamplingEnable {
            sync_handle: 0x0003,
            enable: true,
            slot_durations: 1,
            max_sampled_ctes: 0,
            switch_pattern: &[0, 1, 2, 3],
        })
        .unwrap();

        // controller rejects the command
        let d = host.command_complete(0x2053, &[0x0C, 0x03, 0x00]);
        assert_eq!(d, Disposition::Delivered);
        assert_eq!(
            *events.borrow().last().unwrap(),
            DfEvent::ClAoaEnableComplete {
                status: Status::CommandDisallowed,
                sync_handle: 0x0003,
            }
        );

        let raw = cl_fragment_bytes(0, 4, 0x0003, &[0; 8]);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Dropped);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn antenna_info_failure_is_silently_ignored() {
        let (mut host, events, _) = host(false);
        let d = host.command_complete(0x2058, &[0x11, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(d, Disposition::Absorbed);
        assert!(events.borrow().is_empty());

        let d = host.command_complete(0x2058, &[0x00, 0x03, 0x04, 0x4b, 0x14]);
        assert_eq!(d, Disposition::Delivered);
        let events = events.borrow();
        match events.last().unwrap() {
            DfEvent::AntennaInfo(info) => {
                assert_eq!(info.status, Status::Success);
                assert_eq!(info.num_antennae, 4);
                assert_eq!(info.max_switch_pattern_len, 0x4b);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn local_submit_failure_reports_synthetic_cause() {
        let (mut host, events, commands) = host(true);
        let r = host.connection_cte_response_enable(&command::ConnectionCteResponseEnable {
            conn_handle: 0x0005,
            enable: true,
        });
        assert_eq!(r, Err(Error::Memory));
        assert!(commands.borrow().is_empty());
        assert_eq!(
            events.borrow()[0],
            DfEvent::Error(ErrorReport {
                opcode: Hex(0x2057),
                cause: Hex(CAUSE_OUT_OF_MEMORY),
                handle: 0x0005,
            })
        );
    }

    #[test]
    fn failed_sampling_enable_submit_unregisters_pattern() {
        let (mut host, events, _) = host(true);
        let r = host.set_connectionless_iq_sampling_enable(&command::ConnectionlessIqSamplingEnable {
            sync_handle: 0x0003,
            enable: true,
            slot_durations: 1,
            max_sampled_ctes: 0,
            switch_pattern: &[0, 1, 2, 3],
        });
        assert_eq!(r, Err(Error::Memory));

        // the never-negotiated pattern must not resolve later reports
        let raw = cl_fragment_bytes(0, 4, 0x0003, &[0; 8]);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Dropped);
        // only the local error report was delivered
        assert_eq!(events.borrow().len(), 1);
        assert!(matches!(events.borrow()[0], DfEvent::Error(_)));
    }

    #[test]
    fn sync_lost_forgets_pattern_and_partial_report() {
        let (mut host, events, _) = host(false);
        host.set_connectionless_iq_sampling_enable(&command::ConnectionlessIqSamplingEnable {
            sync_handle: 0x0003,
            enable: true,
            slot_durations: 2,
            max_sampled_ctes: 0,
            switch_pattern: &[0, 1],
        })
        .unwrap();

        // open a partial report, then lose the sync
        let total = (2 * MAX_SAMPLES_PER_FRAGMENT) as u16;
        let data = vec![0; MAX_SAMPLES_PER_FRAGMENT * 2];
        let raw = cl_fragment_bytes(0, total, 0x0003, &data);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Absorbed);

        assert_eq!(
            host.periodic_adv_event(0x10, &[0x03, 0x00]),
            Disposition::Delivered
        );
        assert_eq!(
            *events.borrow().last().unwrap(),
            DfEvent::SyncLost {
                sync_handle: 0x0003
            }
        );

        // the continuation fragment no longer has a session to land in
        let raw = cl_fragment_bytes(1, total, 0x0003, &data);
        assert_eq!(host.hci_event(0x83, &raw), Disposition::Dropped);
    }

    #[test]
    fn periodic_adv_report_copies_payload() {
        let (mut host, events, _) = host(false);
        #[rustfmt::skip]
        let raw = [
            0x03, 0x00, // sync_handle
            0x7f,       // tx_power (not available)
            0xc4,       // rssi (-60)
            0x01,       // cte_type
            0x00,       // data_status (complete)
            0x03,       // data_len
            0xaa, 0xbb, 0xcc,
        ];
        assert_eq!(host.periodic_adv_event(0x0f, &raw), Disposition::Delivered);
        let events = events.borrow();
        match events.last().unwrap() {
            DfEvent::PeriodicAdvReport(report) => {
                assert_eq!(report.sync_handle, 0x0003);
                assert_eq!(report.rssi, -60);
                assert_eq!(&report.data[..], &[0xaa, 0xbb, 0xcc]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn issued_commands_reach_the_transport() {
        let (mut host, _, commands) = host(false);
        host.read_antenna_information().unwrap();
        host.set_periodic_adv_receive_enable(&command::PeriodicAdvReceiveEnable {
            sync_handle: 0x0003,
            enable: true,
        })
        .unwrap();

        let commands = commands.borrow();
        assert_eq!(commands[0], &[0x58, 0x20, 0x00]);
        assert_eq!(commands[1], &[0x59, 0x20, 0x03, 0x03, 0x00, 0x01]);
    }
}
