//! Calling-convention strings
//!
//! A calling convention is `0<arguments>_<results>`, one character per
//! slot: `i` (i32), `I` (i64), `r` (buffer view). `v` spells an empty side,
//! so `0v_v` and `0_` both describe a function with no arguments and no
//! results.

use super::value::ValueKind;
use crate::error::{HalError, Result};
use std::fmt;

/// Typed signature parsed from a calling-convention string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub arguments: Vec<ValueKind>,
    pub results: Vec<ValueKind>,
}

impl FunctionSignature {
    pub fn new(arguments: Vec<ValueKind>, results: Vec<ValueKind>) -> Self {
        Self { arguments, results }
    }

    /// Parse `cconv`, e.g. `"0rr_r"`
    pub fn parse(cconv: &str) -> Result<Self> {
        let bad = |reason: &str| HalError::invalid_argument(format!("malformed calling convention '{cconv}': {reason}"));

        let body = cconv.strip_prefix('0').ok_or_else(|| bad("missing version prefix '0'"))?;
        let (arguments, results) = body.split_once('_').ok_or_else(|| bad("missing '_' separator"))?;
        Ok(Self {
            arguments: parse_fragment(arguments).map_err(|c| bad(&format!("unknown argument kind '{c}'")))?,
            results: parse_fragment(results).map_err(|c| bad(&format!("unknown result kind '{c}'")))?,
        })
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Canonical calling-convention string
    pub fn to_cconv(&self) -> String {
        format!("{self}")
    }
}

fn parse_fragment(fragment: &str) -> std::result::Result<Vec<ValueKind>, char> {
    if fragment == "v" {
        return Ok(Vec::new());
    }
    fragment
        .chars()
        .map(|c| ValueKind::from_cconv_char(c).ok_or(c))
        .collect()
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |kinds: &[ValueKind]| -> String {
            if kinds.is_empty() {
                "v".to_string()
            } else {
                kinds.iter().map(|k| k.cconv_char()).collect()
            }
        };
        write!(f, "0{}_{}", side(&self.arguments), side(&self.results))
    }
}
