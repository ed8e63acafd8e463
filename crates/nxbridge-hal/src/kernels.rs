//! Host kernels shared by the local drivers
//!
//! Kernels operate on raw little-endian element bytes. Elements are read
//! with unaligned loads, so buffers need no particular alignment.
//!
//! # Categories
//!
//! - **Binary**: ADD, SUB, MUL, DIV, MIN, MAX
//! - **Unary**: NEG, ABS
//! - **Data movement**: COPY

use crate::element_type::ElementType;
use crate::error::{HalError, Result};
use bytemuck::Pod;
use half::{bf16, f16};
use rayon::prelude::*;
use std::fmt;

/// Element-wise operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ElementwiseOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Neg,
    Abs,
}

impl ElementwiseOp {
    pub const ALL: [ElementwiseOp; 8] = [
        ElementwiseOp::Add,
        ElementwiseOp::Sub,
        ElementwiseOp::Mul,
        ElementwiseOp::Div,
        ElementwiseOp::Min,
        ElementwiseOp::Max,
        ElementwiseOp::Neg,
        ElementwiseOp::Abs,
    ];

    /// Number of operands
    pub const fn arity(self) -> usize {
        match self {
            ElementwiseOp::Neg | ElementwiseOp::Abs => 1,
            _ => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementwiseOp::Add => "add",
            ElementwiseOp::Sub => "sub",
            ElementwiseOp::Mul => "mul",
            ElementwiseOp::Div => "div",
            ElementwiseOp::Min => "min",
            ElementwiseOp::Max => "max",
            ElementwiseOp::Neg => "neg",
            ElementwiseOp::Abs => "abs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }
}

impl fmt::Display for ElementwiseOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Work a device can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Elementwise(ElementwiseOp),
    /// Copy the input view into the output view
    Copy,
}

// ================================================================================================
// Scalar semantics
// ================================================================================================

trait Scalar: Pod + Send + Sync {
    fn binary(op: ElementwiseOp, a: Self, b: Self) -> Result<Self>;
    fn unary(op: ElementwiseOp, a: Self) -> Result<Self>;
}

fn not_an_op(op: ElementwiseOp) -> HalError {
    HalError::Internal(format!("'{op}' dispatched with the wrong number of operands"))
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            fn binary(op: ElementwiseOp, a: Self, b: Self) -> Result<Self> {
                Ok(match op {
                    ElementwiseOp::Add => a.wrapping_add(b),
                    ElementwiseOp::Sub => a.wrapping_sub(b),
                    ElementwiseOp::Mul => a.wrapping_mul(b),
                    ElementwiseOp::Div => a
                        .checked_div(b)
                        .ok_or_else(|| HalError::invalid_argument("integer division by zero or overflow"))?,
                    ElementwiseOp::Min => a.min(b),
                    ElementwiseOp::Max => a.max(b),
                    ElementwiseOp::Neg | ElementwiseOp::Abs => return Err(not_an_op(op)),
                })
            }

            fn unary(op: ElementwiseOp, a: Self) -> Result<Self> {
                match op {
                    ElementwiseOp::Neg => Ok(a.wrapping_neg()),
                    ElementwiseOp::Abs => Ok(a.wrapping_abs()),
                    _ => Err(not_an_op(op)),
                }
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            fn binary(op: ElementwiseOp, a: Self, b: Self) -> Result<Self> {
                Ok(match op {
                    ElementwiseOp::Add => a.wrapping_add(b),
                    ElementwiseOp::Sub => a.wrapping_sub(b),
                    ElementwiseOp::Mul => a.wrapping_mul(b),
                    ElementwiseOp::Div => a
                        .checked_div(b)
                        .ok_or_else(|| HalError::invalid_argument("integer division by zero"))?,
                    ElementwiseOp::Min => a.min(b),
                    ElementwiseOp::Max => a.max(b),
                    ElementwiseOp::Neg | ElementwiseOp::Abs => return Err(not_an_op(op)),
                })
            }

            fn unary(op: ElementwiseOp, a: Self) -> Result<Self> {
                match op {
                    ElementwiseOp::Neg => Ok(a.wrapping_neg()),
                    ElementwiseOp::Abs => Ok(a),
                    _ => Err(not_an_op(op)),
                }
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            fn binary(op: ElementwiseOp, a: Self, b: Self) -> Result<Self> {
                Ok(match op {
                    ElementwiseOp::Add => a + b,
                    ElementwiseOp::Sub => a - b,
                    ElementwiseOp::Mul => a * b,
                    ElementwiseOp::Div => a / b,
                    ElementwiseOp::Min => a.min(b),
                    ElementwiseOp::Max => a.max(b),
                    ElementwiseOp::Neg | ElementwiseOp::Abs => return Err(not_an_op(op)),
                })
            }

            fn unary(op: ElementwiseOp, a: Self) -> Result<Self> {
                match op {
                    ElementwiseOp::Neg => Ok(-a),
                    ElementwiseOp::Abs => Ok(a.abs()),
                    _ => Err(not_an_op(op)),
                }
            }
        }
    )*};
}

// Half-precision types compute in f32 and round back.
macro_rules! impl_half {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            fn binary(op: ElementwiseOp, a: Self, b: Self) -> Result<Self> {
                f32::binary(op, a.to_f32(), b.to_f32()).map(<$ty>::from_f32)
            }

            fn unary(op: ElementwiseOp, a: Self) -> Result<Self> {
                f32::unary(op, a.to_f32()).map(<$ty>::from_f32)
            }
        }
    )*};
}

// Complex numbers are stored as `[re, im]`.
macro_rules! impl_complex {
    ($($ty:ty),*) => {$(
        impl Scalar for [$ty; 2] {
            fn binary(op: ElementwiseOp, a: Self, b: Self) -> Result<Self> {
                let [ar, ai] = a;
                let [br, bi] = b;
                match op {
                    ElementwiseOp::Add => Ok([ar + br, ai + bi]),
                    ElementwiseOp::Sub => Ok([ar - br, ai - bi]),
                    ElementwiseOp::Mul => Ok([ar * br - ai * bi, ar * bi + ai * br]),
                    ElementwiseOp::Neg | ElementwiseOp::Abs => Err(not_an_op(op)),
                    _ => Err(HalError::unimplemented(format!("'{op}' is not defined for complex elements"))),
                }
            }

            fn unary(op: ElementwiseOp, a: Self) -> Result<Self> {
                match op {
                    ElementwiseOp::Neg => Ok([-a[0], -a[1]]),
                    ElementwiseOp::Abs => Err(HalError::unimplemented("'abs' is not defined for complex elements")),
                    _ => Err(not_an_op(op)),
                }
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64);
impl_unsigned!(u8, u16, u32, u64);
impl_float!(f32, f64);
impl_half!(f16, bf16);
impl_complex!(f32, f64);

// ================================================================================================
// Element loops
// ================================================================================================

type BinaryItem<'a> = (&'a mut [u8], (&'a [u8], &'a [u8]));
type UnaryItem<'a> = (&'a mut [u8], &'a [u8]);

fn run_binary<T: Scalar>(op: ElementwiseOp, a: &[u8], b: &[u8], out: &mut [u8], parallel: bool) -> Result<()> {
    let size = std::mem::size_of::<T>();
    let body = |(o, (x, y)): BinaryItem<'_>| -> Result<()> {
        let value = T::binary(op, bytemuck::pod_read_unaligned(x), bytemuck::pod_read_unaligned(y))?;
        o.copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    };
    if parallel {
        out.par_chunks_exact_mut(size)
            .zip(a.par_chunks_exact(size).zip(b.par_chunks_exact(size)))
            .try_for_each(body)
    } else {
        out.chunks_exact_mut(size)
            .zip(a.chunks_exact(size).zip(b.chunks_exact(size)))
            .try_for_each(body)
    }
}

fn run_unary<T: Scalar>(op: ElementwiseOp, a: &[u8], out: &mut [u8], parallel: bool) -> Result<()> {
    let size = std::mem::size_of::<T>();
    let body = |(o, x): UnaryItem<'_>| -> Result<()> {
        let value = T::unary(op, bytemuck::pod_read_unaligned(x))?;
        o.copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    };
    if parallel {
        out.par_chunks_exact_mut(size).zip(a.par_chunks_exact(size)).try_for_each(body)
    } else {
        out.chunks_exact_mut(size).zip(a.chunks_exact(size)).try_for_each(body)
    }
}

fn run_typed<T: Scalar>(op: ElementwiseOp, inputs: &[&[u8]], out: &mut [u8], parallel: bool) -> Result<()> {
    match inputs {
        [a] => run_unary::<T>(op, a, out, parallel),
        [a, b] => run_binary::<T>(op, a, b, out, parallel),
        _ => Err(not_an_op(op)),
    }
}

/// Apply `op` element-wise.
///
/// Every input must hold exactly `out.len()` bytes of `element_type`
/// elements. With `parallel` set the element loop runs on the rayon pool.
pub fn execute_elementwise(
    op: ElementwiseOp,
    element_type: ElementType,
    inputs: &[&[u8]],
    out: &mut [u8],
    parallel: bool,
) -> Result<()> {
    if inputs.len() != op.arity() {
        return Err(HalError::invalid_argument(format!(
            "'{op}' takes {} operand(s), got {}",
            op.arity(),
            inputs.len()
        )));
    }
    let size = element_type.size_bytes();
    if size == 0 || out.len() % size != 0 {
        return Err(HalError::invalid_argument(format!(
            "output of {} bytes is not a whole number of {element_type} elements",
            out.len()
        )));
    }
    if let Some(bad) = inputs.iter().find(|input| input.len() != out.len()) {
        return Err(HalError::type_mismatch(
            format!("{} operand bytes", out.len()),
            format!("{} bytes", bad.len()),
        ));
    }

    match element_type {
        ElementType::Int8 => run_typed::<i8>(op, inputs, out, parallel),
        ElementType::Int16 => run_typed::<i16>(op, inputs, out, parallel),
        ElementType::Int32 => run_typed::<i32>(op, inputs, out, parallel),
        ElementType::Int64 => run_typed::<i64>(op, inputs, out, parallel),
        ElementType::Uint8 => run_typed::<u8>(op, inputs, out, parallel),
        ElementType::Uint16 => run_typed::<u16>(op, inputs, out, parallel),
        ElementType::Uint32 => run_typed::<u32>(op, inputs, out, parallel),
        ElementType::Uint64 => run_typed::<u64>(op, inputs, out, parallel),
        ElementType::BFloat16 => run_typed::<bf16>(op, inputs, out, parallel),
        ElementType::Float16 => run_typed::<f16>(op, inputs, out, parallel),
        ElementType::Float32 => run_typed::<f32>(op, inputs, out, parallel),
        ElementType::Float64 => run_typed::<f64>(op, inputs, out, parallel),
        ElementType::Complex64 => run_typed::<[f32; 2]>(op, inputs, out, parallel),
        ElementType::Complex128 => run_typed::<[f64; 2]>(op, inputs, out, parallel),
        ElementType::None => Err(HalError::invalid_argument("element type NONE cannot be computed on")),
    }
}
