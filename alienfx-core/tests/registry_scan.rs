//! Registry lifecycle across repeated bus scans

use alienfx_core::registry::{DeviceOpener, DeviceRegistry};
use alienfx_core::{ClassifiedDevice, ProtocolVersion};
use alienfx_transport::{
    BoxedTransport, ProbeCandidate, RecordingTransport, TransportError, UsbEndpoint, UsbInterface,
    USB_CLASS_HID,
};

fn candidate(vid: u16, pid: u16, path: &str, mps: u16) -> ProbeCandidate {
    ProbeCandidate {
        vid,
        pid,
        path: path.into(),
        serial: None,
        manufacturer: Some("Alienware".into()),
        product: Some("Lighting".into()),
        interfaces: vec![UsbInterface {
            class: USB_CLASS_HID,
            endpoints: vec![UsbEndpoint {
                address: 0x81,
                max_packet_size: mps,
            }],
        }],
    }
}

struct CountingOpener {
    opens: usize,
}

impl DeviceOpener for CountingOpener {
    fn open(
        &mut self,
        _device: &ClassifiedDevice,
        candidate: &ProbeCandidate,
    ) -> Result<(BoxedTransport, Option<String>), TransportError> {
        self.opens += 1;
        Ok((
            Box::new(RecordingTransport::new()),
            candidate.description(),
        ))
    }
}

#[test]
fn first_scan_registers_and_flags_arrival() {
    let mut registry = DeviceRegistry::new();
    let mut opener = CountingOpener { opens: 0 };
    let scan = vec![candidate(0x187c, 0x0514, "/dev/hidraw0", 8)];

    assert!(registry.enumerate(&scan, &mut opener));
    assert_eq!(registry.devices().len(), 1);
    let dev = &registry.devices()[0];
    assert!(dev.present && dev.arrived);
    assert_eq!(dev.version, ProtocolVersion::V2);
    assert_eq!(dev.description.as_deref(), Some("Alienware Lighting"));
    assert!(dev.engine.is_some());
    assert_eq!(opener.opens, 1);
}

#[test]
fn rescan_is_idempotent_and_keeps_engines() {
    let mut registry = DeviceRegistry::new();
    let mut opener = CountingOpener { opens: 0 };
    let scan = vec![candidate(0x187c, 0x0514, "/dev/hidraw0", 8)];

    registry.enumerate(&scan, &mut opener);
    assert!(!registry.enumerate(&scan, &mut opener));

    let dev = &registry.devices()[0];
    assert!(dev.present);
    assert!(!dev.arrived);
    // the existing engine was reused, not reopened
    assert_eq!(opener.opens, 1);
}

#[test]
fn duplicate_interfaces_register_once() {
    let mut registry = DeviceRegistry::new();
    let mut opener = CountingOpener { opens: 0 };
    let scan = vec![
        candidate(0x187c, 0x0550, "/dev/hidraw0", 64),
        candidate(0x187c, 0x0550, "/dev/hidraw1", 64),
    ];

    registry.enumerate(&scan, &mut opener);
    assert_eq!(registry.devices().len(), 1);
    assert_eq!(opener.opens, 1);
}

#[test]
fn unknown_devices_are_ignored() {
    let mut registry = DeviceRegistry::new();
    let mut opener = CountingOpener { opens: 0 };
    // right vendor, unclassifiable packet size
    let scan = vec![candidate(0x187c, 0x0514, "/dev/hidraw0", 20)];

    assert!(!registry.enumerate(&scan, &mut opener));
    assert!(registry.devices().is_empty());
    assert_eq!(opener.opens, 0);
}

#[test]
fn removal_keeps_the_record_and_drops_the_engine() {
    let mut registry = DeviceRegistry::new();
    let mut opener = CountingOpener { opens: 0 };
    let scan = vec![candidate(0x187c, 0x0514, "/dev/hidraw0", 8)];

    registry.enumerate(&scan, &mut opener);
    assert!(registry.enumerate(&[], &mut opener));

    assert_eq!(registry.devices().len(), 1);
    let dev = &registry.devices()[0];
    assert!(!dev.present && !dev.arrived);
    assert!(dev.engine.is_none());
    assert_eq!(registry.active_count(), 0);

    // plugging it back in reopens under the same record
    assert!(registry.enumerate(&scan, &mut opener));
    let dev = &registry.devices()[0];
    assert!(dev.present && dev.arrived);
    assert!(dev.engine.is_some());
    assert_eq!(opener.opens, 2);
    assert_eq!(registry.devices().len(), 1);
}

#[test]
fn open_failure_leaves_device_unregistered() {
    struct FailingOpener;
    impl DeviceOpener for FailingOpener {
        fn open(
            &mut self,
            _device: &ClassifiedDevice,
            _candidate: &ProbeCandidate,
        ) -> Result<(BoxedTransport, Option<String>), TransportError> {
            Err(TransportError::HidPermissionDenied("hidraw0".into()))
        }
    }

    let mut registry = DeviceRegistry::new();
    let scan = vec![candidate(0x187c, 0x0514, "/dev/hidraw0", 8)];
    assert!(!registry.enumerate(&scan, &mut FailingOpener));
    assert!(registry.devices().is_empty());
}

#[test]
fn device_id_packs_vid_and_pid() {
    let mut registry = DeviceRegistry::new();
    let mut opener = CountingOpener { opens: 0 };
    registry.enumerate(
        &[candidate(0x187c, 0x0514, "/dev/hidraw0", 8)],
        &mut opener,
    );
    assert_eq!(registry.devices()[0].device_id(), 0x187c_0514);
    assert!(registry.find(0x187c, 0x0514).is_some());
    assert!(registry.find(0x187c, 0x9999).is_none());
}
