//! Recording transport for protocol tests
//!
//! Captures every transfer with its kind and byte image so tests can
//! assert on exact wire traffic, and replays queued byte strings for
//! the read primitives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::Transport;

/// Which primitive a recorded transfer went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    FeatureOut,
    OutputReport,
    InterruptOut,
    InterruptIn,
    FeatureIn,
    InputReport,
}

/// One recorded transfer. For reads, `bytes` is the buffer content
/// after the mock filled it.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub kind: TransferKind,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    log: Vec<Transfer>,
    reads: VecDeque<Vec<u8>>,
    read_fill: Vec<u8>,
}

/// Cloneable recording transport; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the next read primitive call.
    pub fn push_read(&self, bytes: impl Into<Vec<u8>>) {
        self.inner.lock().unwrap().reads.push_back(bytes.into());
    }

    /// Bytes copied into every read buffer once the queue is empty.
    pub fn set_read_fill(&self, bytes: impl Into<Vec<u8>>) {
        self.inner.lock().unwrap().read_fill = bytes.into();
    }

    /// Everything recorded so far, in order.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.inner.lock().unwrap().log.clone()
    }

    /// Only the outbound transfers.
    pub fn sent(&self) -> Vec<Transfer> {
        self.transfers()
            .into_iter()
            .filter(|t| {
                matches!(
                    t.kind,
                    TransferKind::FeatureOut | TransferKind::OutputReport | TransferKind::InterruptOut
                )
            })
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().log.clear();
    }

    fn record_write(&self, kind: TransferKind, data: &[u8]) {
        self.inner.lock().unwrap().log.push(Transfer {
            kind,
            bytes: data.to_vec(),
        });
    }

    fn serve_read(&self, kind: TransferKind, buf: &mut [u8]) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let bytes = inner.reads.pop_front().unwrap_or_else(|| inner.read_fill.clone());
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        inner.log.push(Transfer {
            kind,
            bytes: buf.to_vec(),
        });
        buf.len()
    }
}

impl Transport for RecordingTransport {
    fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
        self.record_write(TransferKind::FeatureOut, data);
        Ok(())
    }

    fn send_output_report(&self, data: &[u8]) -> Result<(), TransportError> {
        self.record_write(TransferKind::OutputReport, data);
        Ok(())
    }

    fn interrupt_write(&self, data: &[u8]) -> Result<usize, TransportError> {
        self.record_write(TransferKind::InterruptOut, data);
        Ok(data.len())
    }

    fn interrupt_read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.serve_read(TransferKind::InterruptIn, buf))
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.serve_read(TransferKind::FeatureIn, buf))
    }

    fn get_input_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.serve_read(TransferKind::InputReport, buf))
    }
}
