//! Transport abstraction layer for AlienFX lighting controllers
//!
//! The lighting controllers in Alienware machines sit behind several USB
//! generations with different transfer styles: plain HID output reports,
//! feature reports, raw interrupt writes, and interrupt write+read pairs.
//! This crate provides the small synchronous primitive set the protocol
//! core drives, one live implementation backed by `hidapi`, and a
//! recording mock for tests.

pub mod error;
pub mod types;

pub mod mock;

mod discovery;
mod hid;

pub use discovery::HidDiscovery;
pub use error::TransportError;
pub use hid::HidTransport;
pub use mock::{RecordingTransport, Transfer, TransferKind};
pub use types::{ProbeCandidate, UsbEndpoint, UsbInterface, USB_CLASS_HID};

/// Transfer timeout applied to every blocking read (ms)
pub const TRANSFER_TIMEOUT_MS: i32 = 1000;

/// The core transport trait - one instance per open device
///
/// All buffers use the logical layout where byte 0 is the report ID slot.
/// A zero report ID means the byte is physically absent on the wire;
/// implementations honour the platform convention (hidapi strips the
/// leading zero itself) and count the virtual byte in returned lengths.
pub trait Transport: Send {
    /// SET_REPORT(Feature) to the control endpoint
    fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError>;

    /// HID output report (interrupt OUT via the kernel's report pipe)
    fn send_output_report(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Raw write to the interrupt OUT endpoint
    fn interrupt_write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Blocking read from the interrupt IN endpoint
    fn interrupt_read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// GET_REPORT(Feature); `buf[0]` selects the report ID
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// GET_REPORT(Input); `buf[0]` selects the report ID
    fn get_input_report(&self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn Transport>;
