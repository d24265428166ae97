use bitflags::bitflags;

bitflags! {
    /// The `/P` permission bitfield (ISO 32000-1 Table 22). Bits are
    /// 1-indexed in the spec; bit 1 and bit 2 are reserved and must always
    /// read as set (an all-1s 32-bit field with every defined permission
    /// granted disables nothing).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        const PRINT                = 1 << 2;
        const MODIFY               = 1 << 3;
        const COPY                 = 1 << 4;
        const ANNOTATE             = 1 << 5;
        const FILL_FORMS           = 1 << 8;
        const EXTRACT_ACCESSIBILITY = 1 << 9;
        const ASSEMBLE             = 1 << 10;
        const PRINT_HIGH_QUALITY   = 1 << 11;
    }
}

impl Permissions {
    pub const RESERVED: u32 = 0b11;
    /// Bits 13-32 (1-indexed), undefined by Table 22 but conventionally
    /// written as 1 by every interoperable writer.
    pub const HIGH_RESERVED: u32 = 0xFFFF_F000;

    /// Decodes a raw `/P` value, forcing the two reserved low bits on.
    pub fn from_bits_relaxed(raw: i64) -> Permissions {
        Permissions::from_bits_truncate(raw as u32 | Self::RESERVED)
    }

    /// Encodes to the signed 32-bit two's-complement form PDF writers use
    /// for `/P` (the high bits are conventionally all set).
    pub fn to_i64(self) -> i64 {
        (self.bits() | Self::RESERVED | Self::HIGH_RESERVED) as i32 as i64
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::all()
    }
}
