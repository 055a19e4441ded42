//! Device classification
//!
//! A controller's generation is a pure function of (vendor, product,
//! check length), where the check length is the interrupt-IN max packet
//! size counted with the report-ID byte included. Candidates come from
//! enumeration with descriptor facts attached; classification itself
//! touches no hardware.

use tracing::debug;

use alienfx_transport::{ProbeCandidate, USB_CLASS_HID};

use crate::catalog::ProtocolVersion;

/// Alienware's own vendor ID
pub const VID_ALIENWARE: u16 = 0x187c;
/// Darfon (V5 keyboards)
pub const VID_DARFON: u16 = 0x0d62;
/// Microchip (V6 external controllers)
pub const VID_MICROCHIP: u16 = 0x0424;
/// Primax (V7 mice)
pub const VID_PRIMAX: u16 = 0x0461;
/// Chicony (V8 keyboards)
pub const VID_CHICONY: u16 = 0x04f2;

/// Microchip PID that is a plain hub, not a lighting controller
const PID_MICROCHIP_HUB: u16 = 0x274c;

/// Whether the measured packet size already counts the report-ID byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthConvention {
    /// e.g. wMaxPacketSize from a USB descriptor
    ExcludesReportId,
    /// e.g. report byte lengths from HID capability queries
    IncludesReportId,
}

impl LengthConvention {
    pub fn check_length(&self, measured: u16) -> u16 {
        match self {
            Self::ExcludesReportId => measured + 1,
            Self::IncludesReportId => measured,
        }
    }
}

/// A candidate that classified as a lighting controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedDevice {
    pub vid: u16,
    pub pid: u16,
    pub version: ProtocolVersion,
    /// Logical report length: check length, plus one pad byte when the
    /// generation has no physical report-ID byte.
    pub report_length: usize,
}

/// Classify by identity and check length.
pub fn classify(vid: u16, pid: u16, check_length: u16) -> Option<ProtocolVersion> {
    match vid {
        VID_DARFON => Some(ProtocolVersion::V5),
        VID_ALIENWARE => match check_length {
            9 => Some(ProtocolVersion::V2),
            12 => Some(ProtocolVersion::V3),
            34 => Some(ProtocolVersion::V4),
            65 => Some(ProtocolVersion::V6),
            _ => None,
        },
        _ if check_length == 65 => match vid {
            VID_MICROCHIP if pid != PID_MICROCHIP_HUB => Some(ProtocolVersion::V6),
            VID_PRIMAX => Some(ProtocolVersion::V7),
            VID_CHICONY => Some(ProtocolVersion::V8),
            _ => None,
        },
        _ => None,
    }
}

/// Report length for a classified device
pub fn report_length(version: ProtocolVersion, check_length: u16) -> usize {
    let pad = usize::from(version.report_id() == 0);
    check_length as usize + pad
}

/// Classify an enumeration candidate.
///
/// The descriptor walk must have found a HID interface with an
/// interrupt-IN endpoint; candidates without one are rejected (hubs,
/// audio interfaces on composite devices).
pub fn probe_candidate(candidate: &ProbeCandidate) -> Option<ClassifiedDevice> {
    if !candidate
        .interfaces
        .iter()
        .any(|i| i.class == USB_CLASS_HID && !i.endpoints.is_empty())
    {
        return None;
    }
    let packet_size = candidate.input_packet_size()?;
    let check_length = LengthConvention::ExcludesReportId.check_length(packet_size);
    let version = classify(candidate.vid, candidate.pid, check_length)?;
    debug!(
        vid = format_args!("{:04x}", candidate.vid),
        pid = format_args!("{:04x}", candidate.pid),
        check_length,
        %version,
        "classified controller"
    );
    Some(ClassifiedDevice {
        vid: candidate.vid,
        pid: candidate.pid,
        version,
        report_length: report_length(version, check_length),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alienfx_transport::{UsbEndpoint, UsbInterface};

    #[test]
    fn classification_table() {
        let cases: &[(u16, u16, u16, Option<ProtocolVersion>)] = &[
            (VID_DARFON, 0x1000, 65, Some(ProtocolVersion::V5)),
            // Darfon keys on vendor alone
            (VID_DARFON, 0x1000, 12, Some(ProtocolVersion::V5)),
            (VID_ALIENWARE, 0x0514, 9, Some(ProtocolVersion::V2)),
            (VID_ALIENWARE, 0x0520, 12, Some(ProtocolVersion::V3)),
            (VID_ALIENWARE, 0x0530, 34, Some(ProtocolVersion::V4)),
            (VID_ALIENWARE, 0x0550, 65, Some(ProtocolVersion::V6)),
            (VID_ALIENWARE, 0x0550, 64, None),
            (VID_MICROCHIP, 0x1000, 65, Some(ProtocolVersion::V6)),
            (VID_MICROCHIP, PID_MICROCHIP_HUB, 65, None),
            (VID_PRIMAX, 0x0a00, 65, Some(ProtocolVersion::V7)),
            (VID_CHICONY, 0x1990, 65, Some(ProtocolVersion::V8)),
            (VID_PRIMAX, 0x0a00, 64, None),
            (0x1234, 0x5678, 65, None),
        ];
        for &(vid, pid, len, expected) in cases {
            assert_eq!(classify(vid, pid, len), expected, "{vid:04x}:{pid:04x}@{len}");
        }
    }

    #[test]
    fn length_conventions() {
        assert_eq!(LengthConvention::ExcludesReportId.check_length(8), 9);
        assert_eq!(LengthConvention::IncludesReportId.check_length(9), 9);
    }

    #[test]
    fn report_length_pads_absent_report_id() {
        assert_eq!(report_length(ProtocolVersion::V2, 9), 9);
        assert_eq!(report_length(ProtocolVersion::V6, 65), 66);
        assert_eq!(report_length(ProtocolVersion::V7, 65), 66);
        assert_eq!(report_length(ProtocolVersion::V8, 65), 65);
    }

    fn candidate(vid: u16, pid: u16, class: u8, mps: u16) -> ProbeCandidate {
        ProbeCandidate {
            vid,
            pid,
            path: "/dev/hidraw9".into(),
            serial: None,
            manufacturer: None,
            product: None,
            interfaces: vec![UsbInterface {
                class,
                endpoints: vec![UsbEndpoint {
                    address: 0x81,
                    max_packet_size: mps,
                }],
            }],
        }
    }

    #[test]
    fn probes_hid_candidates_only() {
        let c = candidate(VID_ALIENWARE, 0x0514, USB_CLASS_HID, 8);
        let d = probe_candidate(&c).unwrap();
        assert_eq!(d.version, ProtocolVersion::V2);
        assert_eq!(d.report_length, 9);

        // same sizing on a non-HID interface: rejected
        assert!(probe_candidate(&candidate(VID_ALIENWARE, 0x0514, 0x09, 8)).is_none());
    }

    #[test]
    fn v6_candidate_gets_padded_length() {
        let c = candidate(VID_ALIENWARE, 0x0550, USB_CLASS_HID, 64);
        let d = probe_candidate(&c).unwrap();
        assert_eq!(d.version, ProtocolVersion::V6);
        assert_eq!(d.report_length, 66);
    }
}
