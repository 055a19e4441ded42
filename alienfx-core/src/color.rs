//! RGB color and the packed 32-bit color/mask word

/// 8-bit-per-channel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }
}

/// The controllers' packed color word: blue in the low byte, then
/// green, red, brightness. Light selection masks travel through the
/// same word, so the byte accessors double as mask-byte accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Selection mask for one light index
    pub const fn light_mask(light: u8) -> Self {
        Self(1u32 << light)
    }

    /// Selection mask for everything but one light
    pub const fn inverse_light_mask(light: u8) -> Self {
        Self(!(1u32 << light))
    }

    pub const fn b(&self) -> u8 {
        self.0 as u8
    }

    pub const fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn br(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Mask bytes in wire order (r, g, b); the brightness byte never
    /// reaches the wire.
    pub const fn mask_bytes(&self) -> [u8; 3] {
        [self.r(), self.g(), self.b()]
    }
}

impl From<Color> for PackedColor {
    fn from(c: Color) -> Self {
        Self((c.b as u32) | (c.g as u32) << 8 | (c.r as u32) << 16)
    }
}

impl From<PackedColor> for Color {
    fn from(p: PackedColor) -> Self {
        Color::new(p.r(), p.g(), p.b())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_byte_order_is_bgr_br() {
        let p = PackedColor::from_bits(0x44332211);
        assert_eq!(p.b(), 0x11);
        assert_eq!(p.g(), 0x22);
        assert_eq!(p.r(), 0x33);
        assert_eq!(p.br(), 0x44);
        assert_eq!(p.mask_bytes(), [0x33, 0x22, 0x11]);
    }

    #[test]
    fn light_masks() {
        assert_eq!(PackedColor::light_mask(0).0, 1);
        assert_eq!(PackedColor::light_mask(5).0, 0x20);
        assert_eq!(PackedColor::inverse_light_mask(5).0, !0x20u32);
    }

    #[test]
    fn color_round_trip() {
        let c = Color::new(0xaa, 0xbb, 0xcc);
        assert_eq!(Color::from(PackedColor::from(c)), c);
        assert_eq!(PackedColor::from(Color::BLACK).0, 0);
    }
}
