//! Reassembly of extended IQ reports from their fragments.
//!
//! The controller splits an IQ report that does not fit one transport frame into fragments of
//! [`MAX_SAMPLES_PER_FRAGMENT`] samples each, numbered by a fragment index. A [`Session`]
//! collects them back into one owned report. Fragments must arrive in order; anything out of
//! sequence discards the partial report and the session waits for the next index-0 fragment.

use crate::df::report::{ConnectionIqReport, ConnectionlessIqReport, SampleBuf};
use crate::hci::event::{
    ConnectionIqFragment, ConnectionlessIqFragment, MAX_SAMPLES_PER_FRAGMENT,
};
use crate::Error;

/// Fragment header fields the reassembly logic needs, independent of the report flavor.
pub(crate) trait IqFragment {
    /// Index of this fragment within the logical report.
    fn index(&self) -> u8;
    /// Sample count of the whole logical report.
    fn total_samples(&self) -> u16;
    /// Sample count carried by this fragment.
    fn fragment_samples(&self) -> u16;
    fn samples(&self) -> &[i8];
}

impl IqFragment for ConnectionIqFragment<'_> {
    fn index(&self) -> u8 {
        self.event_index
    }

    fn total_samples(&self) -> u16 {
        self.total_data_len
    }

    fn fragment_samples(&self) -> u16 {
        u16::from(self.data_len)
    }

    fn samples(&self) -> &[i8] {
        self.samples
    }
}

impl IqFragment for ConnectionlessIqFragment<'_> {
    fn index(&self) -> u8 {
        self.event_index
    }

    fn total_samples(&self) -> u16 {
        self.total_data_len
    }

    fn fragment_samples(&self) -> u16 {
        u16::from(self.data_len)
    }

    fn samples(&self) -> &[i8] {
        self.samples
    }
}

/// An owned report a session can write sample data into.
pub(crate) trait IqReport {
    fn sample_buf_mut(&mut self) -> &mut SampleBuf;
}

impl IqReport for ConnectionIqReport {
    fn sample_buf_mut(&mut self) -> &mut SampleBuf {
        &mut self.samples
    }
}

impl IqReport for ConnectionlessIqReport {
    fn sample_buf_mut(&mut self) -> &mut SampleBuf {
        &mut self.samples
    }
}

/// Outcome of feeding one fragment into a [`Session`].
pub(crate) enum Feed<R> {
    /// The fragment was stored; the report is still incomplete.
    Absorbed,
    /// The fragment completed the report.
    Complete(R),
    /// The fragment was discarded and any partial report abandoned.
    Dropped,
}

/// Reassembly state for one report flavor.
///
/// At most one report is in flight per flavor; the controller interleaves fragments of
/// different reports only across flavors, never within one.
pub(crate) struct Session<R> {
    next_index: u8,
    /// Samples still missing from the partial report.
    remaining: u16,
    partial: Option<R>,
}

impl<R: IqReport> Session<R> {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            remaining: 0,
            partial: None,
        }
    }

    /// Feeds one fragment.
    ///
    /// `start` builds the owned report from the first fragment's header fields; it is invoked
    /// only when `frag` opens a new report (index 0 while the session is idle). `start` failing
    /// or the sample buffer being too small for the announced total drops the fragment.
    pub fn feed<F>(&mut self, frag: &impl IqFragment, start: F) -> Feed<R>
    where
        F: FnOnce() -> Result<R, Error>,
    {
        if self.partial.is_none() {
            if frag.index() != 0 {
                return Feed::Dropped;
            }
            let mut report = match start() {
                Ok(report) => report,
                Err(_) => return Feed::Dropped,
            };
            let total_bytes = usize::from(frag.total_samples()) * 2;
            if report.sample_buf_mut().resize(total_bytes, 0).is_err() {
                return Feed::Dropped;
            }
            self.next_index = 0;
            self.remaining = frag.total_samples();
            self.partial = Some(report);
        }

        if frag.index() != self.next_index {
            self.reset();
            return Feed::Dropped;
        }

        let stored = if let Some(report) = self.partial.as_mut() {
            let offset = usize::from(frag.index()) * MAX_SAMPLES_PER_FRAGMENT * 2;
            let buf = report.sample_buf_mut();
            let data = frag.samples();
            if frag.fragment_samples() <= self.remaining && offset + data.len() <= buf.len() {
                buf[offset..offset + data.len()].copy_from_slice(data);
                true
            } else {
                false
            }
        } else {
            return Feed::Dropped;
        };
        if !stored {
            self.reset();
            return Feed::Dropped;
        }

        self.remaining -= frag.fragment_samples();
        self.next_index = self.next_index.wrapping_add(1);
        if self.remaining != 0 {
            return Feed::Absorbed;
        }
        match self.partial.take() {
            Some(report) => {
                self.reset();
                Feed::Complete(report)
            }
            None => Feed::Dropped,
        }
    }

    /// Abandons any partial report.
    pub fn reset(&mut self) {
        self.next_index = 0;
        self.remaining = 0;
        self.partial = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hci::event::{SampleCtrl, SampleSize};

    fn fragment(index: u8, total: u16, samples: &[i8]) -> ConnectionlessIqFragment<'_> {
        ConnectionlessIqFragment {
            total_data_len: total,
            event_index: index,
            sync_handle: 0x0003,
            channel_index: 5,
            rssi: 0xb4,
            rssi_antenna: 0,
            cte_type: 0,
            slot_duration: 2,
            packet_status: 0,
            event_counter: 7,
            data_len: (samples.len() / 2) as u8,
            sample_rate: 1,
            sample_size: SampleSize::Bits8,
            sample_ctrl: SampleCtrl::empty(),
            samples,
        }
    }

    fn report(frag: &ConnectionlessIqFragment<'_>) -> Result<ConnectionlessIqReport, Error> {
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
            num_ant: 4,
            sample_count: frag.total_data_len,
            samples: SampleBuf::new(),
        })
    }

    fn full_fragment_data(seed: i8) -> [i8; MAX_SAMPLES_PER_FRAGMENT * 2] {
        let mut data = [0; MAX_SAMPLES_PER_FRAGMENT * 2];
        for (i, b) in data.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as i8);
        }
        data
    }

    #[test]
    fn three_fragments_reassemble_in_order() {
        let mut session = Session::new();
        let total = (2 * MAX_SAMPLES_PER_FRAGMENT + 10) as u16;
        let first = full_fragment_data(1);
        let second = full_fragment_data(100);
        let last = [3i8; 20];

        for (index, &data) in [&first[..], &second[..], &last[..]].iter().enumerate() {
            let frag = fragment(index as u8, total, data);
            match session.feed(&frag, || report(&frag)) {
                Feed::Absorbed => assert!(index < 2),
                Feed::Complete(iq) => {
                    assert_eq!(index, 2);
                    assert_eq!(iq.samples.len(), usize::from(total) * 2);
                    assert_eq!(&iq.samples[..first.len()], &first[..]);
                    assert_eq!(&iq.samples[first.len()..2 * first.len()], &second[..]);
                    assert_eq!(&iq.samples[2 * first.len()..], &last[..]);
                    assert_eq!(iq.sample_count, total);
                }
                Feed::Dropped => panic!("fragment {} dropped", index),
            }
        }
    }

    #[test]
    fn out_of_sequence_fragment_abandons_partial() {
        let mut session = Session::new();
        let total = (2 * MAX_SAMPLES_PER_FRAGMENT) as u16;
        let data = full_fragment_data(0);

        let frag = fragment(0, total, &data);
        assert!(matches!(session.feed(&frag, || report(&frag)), Feed::Absorbed));

        // index 2 instead of 1
        let skipped = fragment(2, total, &data);
        assert!(matches!(
            session.feed(&skipped, || report(&skipped)),
            Feed::Dropped
        ));

        // the session is idle again: a fresh index-0 report goes through
        let frag = fragment(0, total, &data);
        assert!(matches!(session.feed(&frag, || report(&frag)), Feed::Absorbed));
        let frag = fragment(1, total, &data);
        assert!(matches!(
            session.feed(&frag, || report(&frag)),
            Feed::Complete(_)
        ));
    }

    #[test]
    fn non_initial_fragment_while_idle_is_dropped() {
        let mut session = Session::new();
        let data = [0i8; 16];
        let frag = fragment(1, 200, &data);
        assert!(matches!(session.feed(&frag, || report(&frag)), Feed::Dropped));
        // still idle, no partial lingers
        let frag = fragment(0, 8, &data);
        assert!(matches!(
            session.feed(&frag, || report(&frag)),
            Feed::Complete(_)
        ));
    }

    #[test]
    fn oversized_total_fails_cleanly() {
        let mut session = Session::new();
        let data = full_fragment_data(0);
        // 1025 samples need 2050 buffer bytes, one more than the buffer holds
        let frag = fragment(0, 1025, &data);
        assert!(matches!(session.feed(&frag, || report(&frag)), Feed::Dropped));

        // session stays usable
        let frag = fragment(0, MAX_SAMPLES_PER_FRAGMENT as u16, &data);
        assert!(matches!(
            session.feed(&frag, || report(&frag)),
            Feed::Complete(_)
        ));
    }
}
