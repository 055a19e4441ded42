//! Device registry: the set of known controllers across re-scans
//!
//! Enumeration is cheap and callers run it repeatedly; the registry
//! keeps device records (and their open engines) stable across scans.
//! A device that disappears keeps its record with the engine dropped;
//! when it comes back it is re-opened under the same record and flagged
//! as arrived again.

use tracing::{info, warn};

use alienfx_transport::{BoxedTransport, ProbeCandidate, TransportError};

use crate::catalog::ProtocolVersion;
use crate::engine::ProtocolEngine;
use crate::probe::{self, ClassifiedDevice};

/// Opens a transport for a classified candidate. Returns the transport
/// plus a best-effort human-readable description.
pub trait DeviceOpener {
    fn open(
        &mut self,
        device: &ClassifiedDevice,
        candidate: &ProbeCandidate,
    ) -> Result<(BoxedTransport, Option<String>), TransportError>;
}

impl<F> DeviceOpener for F
where
    F: FnMut(
        &ClassifiedDevice,
        &ProbeCandidate,
    ) -> Result<(BoxedTransport, Option<String>), TransportError>,
{
    fn open(
        &mut self,
        device: &ClassifiedDevice,
        candidate: &ProbeCandidate,
    ) -> Result<(BoxedTransport, Option<String>), TransportError> {
        self(device, candidate)
    }
}

/// One known controller
pub struct RegisteredDevice {
    pub vid: u16,
    pub pid: u16,
    pub version: ProtocolVersion,
    pub report_length: usize,
    pub description: Option<String>,
    /// Seen in the latest scan
    pub present: bool,
    /// Newly appeared in the latest scan
    pub arrived: bool,
    /// Open engine; `None` while the device is unplugged
    pub engine: Option<ProtocolEngine>,
}

impl RegisteredDevice {
    /// (vid, pid) packed the way the mappings file keys devices
    pub fn device_id(&self) -> u32 {
        (u32::from(self.vid) << 16) | u32::from(self.pid)
    }
}

#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<RegisteredDevice>,
    /// True after a scan that added or removed something
    pub device_list_changed: bool,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[RegisteredDevice] {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut [RegisteredDevice] {
        &mut self.devices
    }

    pub fn find(&self, vid: u16, pid: u16) -> Option<&RegisteredDevice> {
        self.devices.iter().find(|d| d.vid == vid && d.pid == pid)
    }

    pub fn find_mut(&mut self, vid: u16, pid: u16) -> Option<&mut RegisteredDevice> {
        self.devices.iter_mut().find(|d| d.vid == vid && d.pid == pid)
    }

    pub fn active_count(&self) -> usize {
        self.devices.iter().filter(|d| d.present).count()
    }

    /// Classify and absorb one scan's candidates.
    ///
    /// Known devices seen again keep their engine; the fresh probe is
    /// discarded. A candidate with the same (vid, pid) as one already
    /// absorbed this scan is a second HID interface of the same
    /// controller and is skipped. Returns true when the device list
    /// changed (arrival or removal).
    pub fn enumerate(
        &mut self,
        candidates: &[ProbeCandidate],
        opener: &mut dyn DeviceOpener,
    ) -> bool {
        self.device_list_changed = false;
        for device in &mut self.devices {
            device.present = false;
            device.arrived = false;
        }

        for candidate in candidates {
            let Some(classified) = probe::probe_candidate(candidate) else {
                continue;
            };

            if let Some(existing) = self.find_mut(classified.vid, classified.pid) {
                if existing.present {
                    // same controller, another interface
                    continue;
                }
                existing.present = true;
                if existing.engine.is_none() {
                    // returned after an unplug: reopen under the old record
                    match opener.open(&classified, candidate) {
                        Ok((transport, description)) => {
                            existing.engine = Some(ProtocolEngine::new(classified, transport));
                            existing.description = description.or(existing.description.take());
                            existing.arrived = true;
                            self.device_list_changed = true;
                        }
                        Err(e) => {
                            warn!(
                                vid = format_args!("{:04x}", classified.vid),
                                pid = format_args!("{:04x}", classified.pid),
                                "reopen failed: {e}"
                            );
                            existing.present = false;
                        }
                    }
                }
                continue;
            }

            match opener.open(&classified, candidate) {
                Ok((transport, description)) => {
                    info!(
                        vid = format_args!("{:04x}", classified.vid),
                        pid = format_args!("{:04x}", classified.pid),
                        version = %classified.version,
                        ?description,
                        "new controller"
                    );
                    self.devices.push(RegisteredDevice {
                        vid: classified.vid,
                        pid: classified.pid,
                        version: classified.version,
                        report_length: classified.report_length,
                        description,
                        present: true,
                        arrived: true,
                        engine: Some(ProtocolEngine::new(classified, transport)),
                    });
                    self.device_list_changed = true;
                }
                Err(e) => {
                    warn!(
                        vid = format_args!("{:04x}", classified.vid),
                        pid = format_args!("{:04x}", classified.pid),
                        "open failed: {e}"
                    );
                }
            }
        }

        for device in &mut self.devices {
            if !device.present && device.engine.is_some() {
                info!(
                    vid = format_args!("{:04x}", device.vid),
                    pid = format_args!("{:04x}", device.pid),
                    "controller removed"
                );
                device.engine = None;
                self.device_list_changed = true;
            }
        }

        self.device_list_changed
    }
}
