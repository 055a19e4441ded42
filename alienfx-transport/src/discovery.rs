//! Device discovery for AlienFX lighting controllers
//!
//! Enumeration is two-sided on Linux: hidapi yields the hidraw paths and
//! USB strings, while the configuration-descriptor facts the prober needs
//! (interface class, endpoint addresses, IN max packet size) come from
//! sysfs, since hidraw does not expose them.

use std::fs;
use std::path::Path;

use hidapi::HidApi;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::hid::HidTransport;
use crate::types::{ProbeCandidate, UsbEndpoint, UsbInterface};

/// Vendor IDs that ship AlienFX controllers
///
/// Alienware's own VID plus the OEMs (Darfon, Microchip, Primax, Chicony)
/// that build the external peripherals. Classification happens in the
/// core; here the list only trims enumeration noise.
pub const KNOWN_VENDORS: [u16; 5] = [0x187c, 0x0d62, 0x0424, 0x0461, 0x04f2];

const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

/// HID device discovery
pub struct HidDiscovery {
    api: HidApi,
    sysfs_root: std::path::PathBuf,
}

impl HidDiscovery {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            api: HidApi::new()?,
            sysfs_root: SYSFS_USB_DEVICES.into(),
        })
    }

    /// Point the descriptor walk somewhere else (tests).
    pub fn with_sysfs_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    /// Re-scan the bus and list candidates from known vendors.
    ///
    /// One candidate per hidraw node; a controller exposing several HID
    /// interfaces shows up several times and the registry dedupes by
    /// (vid, pid).
    pub fn candidates(&mut self) -> Result<Vec<ProbeCandidate>, TransportError> {
        self.api.refresh_devices()?;

        let mut found = Vec::new();
        for info in self.api.device_list() {
            let vid = info.vendor_id();
            let pid = info.product_id();
            if !KNOWN_VENDORS.contains(&vid) {
                continue;
            }
            let interfaces = read_usb_interfaces(&self.sysfs_root, vid, pid);
            found.push(ProbeCandidate {
                vid,
                pid,
                path: info.path().to_string_lossy().into_owned(),
                serial: info.serial_number().map(str::to_owned),
                manufacturer: info.manufacturer_string().map(str::to_owned),
                product: info.product_string().map(str::to_owned),
                interfaces,
            });
        }
        debug!("enumeration found {} candidate(s)", found.len());
        Ok(found)
    }

    /// Open a candidate's hidraw node.
    pub fn open(&self, candidate: &ProbeCandidate) -> Result<HidTransport, TransportError> {
        HidTransport::open(&self.api, candidate)
    }
}

/// Walk sysfs for the USB device matching (vid, pid) and collect its
/// interface descriptors. Missing attributes degrade to an empty list,
/// which the prober rejects as unsizable.
fn read_usb_interfaces(root: &Path, vid: u16, pid: u16) -> Vec<UsbInterface> {
    let entries = match fs::read_dir(root) {
        Ok(e) => e,
        Err(e) => {
            warn!("sysfs walk failed at {}: {e}", root.display());
            return Vec::new();
        }
    };

    for entry in entries.flatten() {
        let dev = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        // Interface dirs carry a ':'; device dirs do not
        if name.contains(':') {
            continue;
        }
        if read_hex_attr(&dev, "idVendor") != Some(vid as u32)
            || read_hex_attr(&dev, "idProduct") != Some(pid as u32)
        {
            continue;
        }

        let mut interfaces = Vec::new();
        if let Ok(children) = fs::read_dir(&dev) {
            for child in children.flatten() {
                let iface = child.path();
                if !child.file_name().to_string_lossy().starts_with(&format!("{name}:")) {
                    continue;
                }
                let class = read_hex_attr(&iface, "bInterfaceClass").unwrap_or(0) as u8;
                interfaces.push(UsbInterface {
                    class,
                    endpoints: read_endpoints(&iface),
                });
            }
        }
        return interfaces;
    }
    Vec::new()
}

fn read_endpoints(iface: &Path) -> Vec<UsbEndpoint> {
    let mut endpoints = Vec::new();
    if let Ok(children) = fs::read_dir(iface) {
        for child in children.flatten() {
            if !child.file_name().to_string_lossy().starts_with("ep_") {
                continue;
            }
            let ep = child.path();
            let (Some(address), Some(mps)) = (
                read_hex_attr(&ep, "bEndpointAddress"),
                read_hex_attr(&ep, "wMaxPacketSize"),
            ) else {
                continue;
            };
            endpoints.push(UsbEndpoint {
                address: address as u8,
                // Mask the high-bandwidth transaction bits
                max_packet_size: (mps as u16) & 0x07ff,
            });
        }
    }
    endpoints.sort_by_key(|ep| ep.address);
    endpoints
}

fn read_hex_attr(dir: &Path, attr: &str) -> Option<u32> {
    let raw = fs::read_to_string(dir.join(attr)).ok()?;
    u32::from_str_radix(raw.trim(), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_attr(dir: &Path, attr: &str, value: &str) {
        fs::write(dir.join(attr), value).unwrap();
    }

    #[test]
    fn sysfs_walk_collects_hid_endpoints() {
        let root = std::env::temp_dir().join(format!("afx-sysfs-{}", std::process::id()));
        let dev = root.join("1-3");
        let iface = root.join("1-3").join("1-3:1.0");
        let ep = iface.join("ep_81");
        fs::create_dir_all(&ep).unwrap();
        write_attr(&dev, "idVendor", "187c\n");
        write_attr(&dev, "idProduct", "0550\n");
        write_attr(&iface, "bInterfaceClass", "03\n");
        write_attr(&ep, "bEndpointAddress", "81\n");
        write_attr(&ep, "wMaxPacketSize", "0040\n");

        let interfaces = read_usb_interfaces(&root, 0x187c, 0x0550);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].class, 0x03);
        assert_eq!(
            interfaces[0].endpoints,
            vec![UsbEndpoint {
                address: 0x81,
                max_packet_size: 0x40
            }]
        );

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn sysfs_walk_ignores_other_devices() {
        let root = std::env::temp_dir().join(format!("afx-sysfs-none-{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        assert!(read_usb_interfaces(&root, 0x187c, 0x0550).is_empty());
        fs::remove_dir_all(&root).unwrap();
    }
}
