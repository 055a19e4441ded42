//! hidapi-backed transport for a single open controller

use std::sync::Mutex;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::types::ProbeCandidate;
use crate::{Transport, TRANSFER_TIMEOUT_MS};

/// Live HID transport
///
/// Wraps one `HidDevice` handle. hidapi serialises nothing itself, so
/// the handle sits behind a mutex; the protocol core is single-threaded
/// but the registry may be shared.
pub struct HidTransport {
    device: Mutex<HidDevice>,
    /// "Manufacturer Product" read at open time, best effort
    description: Option<String>,
    /// Device has no report IDs: hidapi wants a 0x00 sentinel byte
    /// prepended to every write, which the wire image omits
    unnumbered: bool,
}

impl HidTransport {
    /// Open the candidate's HID path.
    pub fn open(api: &HidApi, candidate: &ProbeCandidate) -> Result<Self, TransportError> {
        let path = std::ffi::CString::new(candidate.path.as_bytes())
            .map_err(|_| TransportError::DeviceNotFound(candidate.path.clone()))?;
        let device = api.open_path(&path)?;

        // Prefer live string reads over enumeration-time caches
        let manufacturer = device.get_manufacturer_string().ok().flatten();
        let product = device.get_product_string().ok().flatten();
        let description = match (manufacturer, product) {
            (Some(m), Some(p)) => Some(format!("{m} {p}")),
            (_, Some(p)) => Some(p),
            (Some(m), _) => Some(m),
            _ => candidate.description(),
        };
        debug!(
            vid = format_args!("{:04x}", candidate.vid),
            pid = format_args!("{:04x}", candidate.pid),
            ?description,
            "opened controller"
        );

        Ok(Self {
            device: Mutex::new(device),
            description,
            unnumbered: false,
        })
    }

    /// Wrap an already-open handle (tests, custom enumeration).
    pub fn from_device(device: HidDevice, description: Option<String>) -> Self {
        Self {
            device: Mutex::new(device),
            description,
            unnumbered: false,
        }
    }

    /// Mark the device as using unnumbered reports (report ID zero).
    pub fn with_unnumbered_reports(mut self) -> Self {
        self.unnumbered = true;
        self
    }

    fn write_image(&self, data: &[u8]) -> Vec<u8> {
        if self.unnumbered {
            let mut image = Vec::with_capacity(data.len() + 1);
            image.push(0x00);
            image.extend_from_slice(data);
            image
        } else {
            data.to_vec()
        }
    }

    /// USB strings read at open time
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HidDevice> {
        // Mutex poisoning only happens if a holder panicked; the inner
        // handle has no invariants of ours to protect.
        match self.device.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for HidTransport {
    fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
        trace!("feature out: {:02X?}", data);
        self.lock().send_feature_report(data)?;
        Ok(())
    }

    fn send_output_report(&self, data: &[u8]) -> Result<(), TransportError> {
        trace!("output report: {:02X?}", data);
        let image = self.write_image(data);
        let written = self.lock().write(&image)?;
        if written < image.len() {
            return Err(TransportError::ShortTransfer {
                expected: image.len(),
                actual: written,
            });
        }
        Ok(())
    }

    fn interrupt_write(&self, data: &[u8]) -> Result<usize, TransportError> {
        trace!("interrupt out: {:02X?}", data);
        Ok(self.lock().write(&self.write_image(data))?)
    }

    fn interrupt_read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = self.lock().read_timeout(buf, TRANSFER_TIMEOUT_MS)?;
        if n == 0 {
            return Err(TransportError::Timeout);
        }
        trace!("interrupt in: {:02X?}", &buf[..n]);
        Ok(n)
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = self.lock().get_feature_report(buf)?;
        trace!("feature in: {:02X?}", &buf[..n]);
        Ok(n)
    }

    fn get_input_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = self.lock().get_input_report(buf)?;
        trace!("input report: {:02X?}", &buf[..n]);
        Ok(n)
    }
}
