//! Element types of buffer views
//!
//! The raw tag packs a numerical class and a bit width:
//! `(numerical_type << 24) | bit_count`. The raw value is what crosses the
//! wire, so the discriminants below are fixed.

use std::fmt;

const fn element_type_value(numerical_type: u32, bit_count: u32) -> u32 {
    (numerical_type << 24) | bit_count
}

const NUMERICAL_INTEGER_SIGNED: u32 = 0x11;
const NUMERICAL_INTEGER_UNSIGNED: u32 = 0x12;
const NUMERICAL_FLOAT_IEEE: u32 = 0x21;
const NUMERICAL_FLOAT_BRAIN: u32 = 0x22;
const NUMERICAL_FLOAT_COMPLEX: u32 = 0x23;

/// Element type of a buffer view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum ElementType {
    /// Invalid / unknown element type
    None = 0,

    Int8 = element_type_value(NUMERICAL_INTEGER_SIGNED, 8),
    Int16 = element_type_value(NUMERICAL_INTEGER_SIGNED, 16),
    Int32 = element_type_value(NUMERICAL_INTEGER_SIGNED, 32),
    Int64 = element_type_value(NUMERICAL_INTEGER_SIGNED, 64),

    Uint8 = element_type_value(NUMERICAL_INTEGER_UNSIGNED, 8),
    Uint16 = element_type_value(NUMERICAL_INTEGER_UNSIGNED, 16),
    Uint32 = element_type_value(NUMERICAL_INTEGER_UNSIGNED, 32),
    Uint64 = element_type_value(NUMERICAL_INTEGER_UNSIGNED, 64),

    BFloat16 = element_type_value(NUMERICAL_FLOAT_BRAIN, 16),
    Float16 = element_type_value(NUMERICAL_FLOAT_IEEE, 16),
    Float32 = element_type_value(NUMERICAL_FLOAT_IEEE, 32),
    Float64 = element_type_value(NUMERICAL_FLOAT_IEEE, 64),

    /// Two f32 components
    Complex64 = element_type_value(NUMERICAL_FLOAT_COMPLEX, 64),
    /// Two f64 components
    Complex128 = element_type_value(NUMERICAL_FLOAT_COMPLEX, 128),
}

impl ElementType {
    /// Every valid element type
    pub const ALL: [ElementType; 14] = [
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::Uint8,
        ElementType::Uint16,
        ElementType::Uint32,
        ElementType::Uint64,
        ElementType::BFloat16,
        ElementType::Float16,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Complex64,
        ElementType::Complex128,
    ];

    /// Raw tag value
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Decode a raw tag; unknown tags yield `None`
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.raw() == raw)
    }

    pub const fn bit_count(self) -> usize {
        (self.raw() & 0xFF) as usize
    }

    /// Size of one element in bytes
    pub const fn size_bytes(self) -> usize {
        self.bit_count().div_ceil(8)
    }

    pub const fn is_valid(self) -> bool {
        !matches!(self, ElementType::None)
    }

    pub const fn is_float(self) -> bool {
        matches!(
            self,
            ElementType::BFloat16 | ElementType::Float16 | ElementType::Float32 | ElementType::Float64
        )
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, ElementType::Complex64 | ElementType::Complex128)
    }

    pub const fn is_integer(self) -> bool {
        self.is_valid() && !self.is_float() && !self.is_complex()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::None => "none",
            ElementType::Int8 => "i8",
            ElementType::Int16 => "i16",
            ElementType::Int32 => "i32",
            ElementType::Int64 => "i64",
            ElementType::Uint8 => "u8",
            ElementType::Uint16 => "u16",
            ElementType::Uint32 => "u32",
            ElementType::Uint64 => "u64",
            ElementType::BFloat16 => "bf16",
            ElementType::Float16 => "f16",
            ElementType::Float32 => "f32",
            ElementType::Float64 => "f64",
            ElementType::Complex64 => "complex<f32>",
            ElementType::Complex128 => "complex<f64>",
        };
        f.write_str(name)
    }
}
