//! Packet assembly from Pascal templates and byte patches
//!
//! Every outgoing packet is built the same way regardless of
//! generation: prime a buffer with the generation's fill byte, copy the
//! template payload, put the report ID at byte 0, apply the patches.
//! Generations without a physical report-ID byte (report ID zero) use
//! the same templates and patch offsets; the whole image shifts down
//! one byte instead, in one named code path.

/// A byte run written over the template at a fixed offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl Patch {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }
}

/// A wire-ready packet image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPacket {
    pub bytes: Vec<u8>,
    /// True when the packet carries no patch longer than one byte.
    /// The V8 transport dispatch keys on this: short control packets go
    /// out as feature reports, data-bearing ones as plain writes.
    pub single_byte_patch: bool,
}

/// Assemble a packet.
///
/// `template[0]` is the payload length; the payload starts at the
/// report-ID slot. `length` is the device's report length, patches past
/// it are truncated rather than panicking.
pub fn build(template: &[u8], report_id: u8, length: usize, fill: u8, patches: &[Patch]) -> BuiltPacket {
    debug_assert!(!template.is_empty() && template[0] as usize <= template.len() - 1);

    let mut bytes = vec![fill; length];
    let payload_len = (template[0] as usize).min(length);

    let single_byte_patch = patches.iter().all(|p| p.bytes.len() <= 1);

    if report_id == 0 {
        shift_for_absent_report_id(template, payload_len, patches, &mut bytes);
    } else {
        bytes[..payload_len].copy_from_slice(&template[1..=payload_len]);
        bytes[0] = report_id;
        for patch in patches {
            apply(&mut bytes, patch.offset, &patch.bytes);
        }
    }

    BuiltPacket {
        bytes,
        single_byte_patch,
    }
}

/// The report-ID-zero path: no byte exists for the ID, so the template
/// payload lands one byte lower and every patch offset shifts with it.
fn shift_for_absent_report_id(template: &[u8], payload_len: usize, patches: &[Patch], bytes: &mut [u8]) {
    // payload[0] is the (zero) ID slot; skip it
    let shifted = payload_len.saturating_sub(1);
    bytes[..shifted].copy_from_slice(&template[2..2 + shifted]);
    for patch in patches {
        debug_assert!(patch.offset > 0);
        apply(bytes, patch.offset.saturating_sub(1), &patch.bytes);
    }
}

fn apply(bytes: &mut [u8], offset: usize, data: &[u8]) {
    if offset >= bytes.len() {
        return;
    }
    let n = data.len().min(bytes.len() - offset);
    bytes[offset..offset + n].copy_from_slice(&data[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: [u8; 4] = [3, 0x02, 0x07, 0x04];

    #[test]
    fn injects_report_id_and_pads() {
        let p = build(&TEMPLATE, 0x02, 9, 0x00, &[]);
        assert_eq!(p.bytes, vec![0x02, 0x07, 0x04, 0, 0, 0, 0, 0, 0]);
        assert!(p.single_byte_patch);
    }

    #[test]
    fn primes_with_fill_byte() {
        let p = build(&TEMPLATE, 0x02, 6, 0xff, &[]);
        assert_eq!(p.bytes, vec![0x02, 0x07, 0x04, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn applies_patches_in_order() {
        let p = build(
            &TEMPLATE,
            0x02,
            9,
            0x00,
            &[Patch::new(2, vec![0xaa]), Patch::new(3, vec![1, 2, 3])],
        );
        assert_eq!(p.bytes, vec![0x02, 0x07, 0xaa, 1, 2, 3, 0, 0, 0]);
        assert!(!p.single_byte_patch);
    }

    #[test]
    fn zero_report_id_shifts_payload_and_offsets() {
        // Same template and offsets as above; image one byte lower.
        let p = build(
            &TEMPLATE,
            0x00,
            8,
            0x00,
            &[Patch::new(2, vec![0xaa]), Patch::new(3, vec![1, 2, 3])],
        );
        assert_eq!(p.bytes, vec![0x07, 0xaa, 1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn truncates_patches_past_report_length() {
        let p = build(&TEMPLATE, 0x02, 5, 0x00, &[Patch::new(3, vec![9, 9, 9, 9])]);
        assert_eq!(p.bytes, vec![0x02, 0x07, 0x04, 9, 9]);
        let q = build(&TEMPLATE, 0x02, 5, 0x00, &[Patch::new(64, vec![1])]);
        assert_eq!(q.bytes.len(), 5);
    }

    #[test]
    fn single_byte_flag_on_empty_patch_list() {
        assert!(build(&TEMPLATE, 0x02, 9, 0, &[]).single_byte_patch);
        assert!(build(&TEMPLATE, 0x02, 9, 0, &[Patch::new(2, vec![1])]).single_byte_patch);
    }
}
