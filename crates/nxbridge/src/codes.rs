//! Short element-type codes used by hosts (`"f32"`, `"i64"`, ...)

use nxbridge_hal::ElementType;

const CODES: [(&str, ElementType); 14] = [
    ("i8", ElementType::Int8),
    ("i16", ElementType::Int16),
    ("i32", ElementType::Int32),
    ("i64", ElementType::Int64),
    ("u8", ElementType::Uint8),
    ("u16", ElementType::Uint16),
    ("u32", ElementType::Uint32),
    ("u64", ElementType::Uint64),
    ("bf16", ElementType::BFloat16),
    ("f16", ElementType::Float16),
    ("f32", ElementType::Float32),
    ("f64", ElementType::Float64),
    ("c64", ElementType::Complex64),
    ("c128", ElementType::Complex128),
];

/// Element type for `code`; unknown codes give [`ElementType::None`].
///
/// Signed integers are also accepted as `s8`..`s64`.
pub fn element_type_from_code(code: &str) -> ElementType {
    let canonical = match code {
        "s8" => "i8",
        "s16" => "i16",
        "s32" => "i32",
        "s64" => "i64",
        other => other,
    };
    CODES
        .iter()
        .find(|(c, _)| *c == canonical)
        .map(|(_, ty)| *ty)
        .unwrap_or(ElementType::None)
}

/// Canonical code for `element_type`; `None` for [`ElementType::None`]
pub fn element_type_to_code(element_type: ElementType) -> Option<&'static str> {
    CODES.iter().find(|(_, ty)| *ty == element_type).map(|(c, _)| *c)
}
