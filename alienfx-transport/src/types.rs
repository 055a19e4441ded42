//! Common types for the transport layer

/// A single USB endpoint as read from the configuration descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbEndpoint {
    /// bEndpointAddress (bit 7 set = IN)
    pub address: u8,
    /// wMaxPacketSize with the high-bandwidth bits masked off
    pub max_packet_size: u16,
}

impl UsbEndpoint {
    /// Check the direction bit
    pub fn is_input(&self) -> bool {
        self.address & 0x80 != 0
    }
}

/// A USB interface with its endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbInterface {
    /// bInterfaceClass (0x03 = HID)
    pub class: u8,
    pub endpoints: Vec<UsbEndpoint>,
}

/// USB HID interface class
pub const USB_CLASS_HID: u8 = 0x03;

/// A device found during enumeration, before protocol classification.
///
/// Carries everything the prober needs: identity, the HID path to open,
/// best-effort USB strings, and the interface/endpoint facts read from
/// the configuration descriptor.
#[derive(Debug, Clone)]
pub struct ProbeCandidate {
    pub vid: u16,
    pub pid: u16,
    /// hidapi device path
    pub path: String,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub interfaces: Vec<UsbInterface>,
}

impl ProbeCandidate {
    /// Max packet size of the first interrupt-IN endpoint on a HID
    /// interface, if the descriptor walk found one.
    pub fn input_packet_size(&self) -> Option<u16> {
        self.interfaces
            .iter()
            .filter(|i| i.class == USB_CLASS_HID)
            .flat_map(|i| i.endpoints.iter())
            .find(|ep| ep.is_input())
            .map(|ep| ep.max_packet_size)
    }

    /// "Vendor Product" from the USB strings, when present.
    pub fn description(&self) -> Option<String> {
        match (&self.manufacturer, &self.product) {
            (Some(m), Some(p)) => Some(format!("{m} {p}")),
            (None, Some(p)) => Some(p.clone()),
            (Some(m), None) => Some(m.clone()),
            (None, None) => None,
        }
    }
}
