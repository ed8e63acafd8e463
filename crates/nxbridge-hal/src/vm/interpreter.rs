//! Synchronous bytecode interpreter

use super::bytecode::{Callee, Instruction};
use super::context::{Context, Function, Target};
use super::module::ModuleRef;
use super::signature::FunctionSignature;
use super::value::{Value, VariantList};
use crate::error::{HalError, Result};

/// Maximum nesting of bytecode calls
pub const MAX_CALL_DEPTH: usize = 128;

/// Invoke `function` with `inputs`, replacing the contents of `outputs` with
/// its results.
///
/// `inputs` must match the function signature exactly: same count and the
/// same kind in every slot. Blocks until every dispatched kernel finished.
pub fn invoke(context: &Context, function: &Function, inputs: &VariantList, outputs: &mut VariantList) -> Result<()> {
    let signature = function.signature();
    if inputs.len() != signature.argument_count() {
        return Err(HalError::invalid_argument(format!(
            "function '{}' expects {} argument(s), got {}",
            function.name(),
            signature.argument_count(),
            inputs.len()
        )));
    }
    let args = inputs
        .iter()
        .enumerate()
        .map(|(index, value)| match value {
            Some(value) => Ok(value.clone()),
            None => Err(HalError::invalid_argument(format!("argument {index} is unset"))),
        })
        .collect::<Result<Vec<_>>>()?;
    check_kinds(signature, &args, function.name())?;

    tracing::trace!(function = function.name(), arguments = args.len(), "vm_invoke_begin");
    let results = Interpreter { context }.call(function.module, &function.target, args, 0)?;
    if results.len() != signature.result_count() {
        return Err(HalError::Internal(format!(
            "function '{}' produced {} result(s), signature declares {}",
            function.name(),
            results.len(),
            signature.result_count()
        )));
    }
    outputs.assign(results);
    Ok(())
}

fn check_kinds(signature: &FunctionSignature, args: &[Value], name: &str) -> Result<()> {
    for (index, (value, expected)) in args.iter().zip(&signature.arguments).enumerate() {
        if value.kind() != *expected {
            return Err(HalError::invalid_argument(format!(
                "argument {index} of '{name}' must be {expected}, got {}",
                value.kind()
            )));
        }
    }
    Ok(())
}

struct Interpreter<'a> {
    context: &'a Context,
}

impl Interpreter<'_> {
    fn call(&self, module: usize, target: &Target, args: Vec<Value>, depth: usize) -> Result<Vec<Value>> {
        if depth >= MAX_CALL_DEPTH {
            return Err(HalError::ResourceExhausted(format!(
                "call depth exceeded {MAX_CALL_DEPTH}"
            )));
        }
        let linked = self
            .context
            .modules
            .get(module)
            .ok_or_else(|| HalError::Internal(format!("module index {module} is not linked")))?;

        match (&linked.module, target) {
            (ModuleRef::Native(native), Target::Native(function)) => native.call(function, &args),
            (ModuleRef::Bytecode(bytecode), Target::Bytecode(index)) => {
                let function = bytecode
                    .function(*index)
                    .ok_or_else(|| HalError::Internal(format!("function index {index} is not defined")))?;

                let mut registers: Vec<Option<Value>> = vec![None; function.register_count];
                for (slot, value) in registers.iter_mut().zip(args) {
                    *slot = Some(value);
                }

                for instruction in &function.body {
                    match instruction {
                        Instruction::ConstI32 { dst, value } => registers[usize::from(*dst)] = Some(Value::I32(*value)),
                        Instruction::ConstI64 { dst, value } => registers[usize::from(*dst)] = Some(Value::I64(*value)),
                        Instruction::Move { dst, src } => {
                            let value = read(&registers, *src, &function.name)?;
                            registers[usize::from(*dst)] = Some(value);
                        }
                        Instruction::Call { callee, args, results } => {
                            let call_args = args
                                .iter()
                                .map(|r| read(&registers, *r, &function.name))
                                .collect::<Result<Vec<_>>>()?;
                            let (callee_module, callee_target, name) = match callee {
                                Callee::Import(i) => {
                                    let import = linked.imports.get(*i as usize).ok_or_else(|| {
                                        HalError::Internal(format!("import {i} is not resolved"))
                                    })?;
                                    let name = bytecode
                                        .imports()
                                        .get(*i as usize)
                                        .map(|import| import.full_name())
                                        .unwrap_or_default();
                                    (import.module, import.target.clone(), name)
                                }
                                Callee::Function(f) => (
                                    module,
                                    Target::Bytecode(*f as usize),
                                    format!("{}.{}", bytecode.name(), *f),
                                ),
                            };
                            let signature = self.signature_of(callee_module, &callee_target)?;
                            check_kinds(&signature, &call_args, &name)?;

                            let values = self.call(callee_module, &callee_target, call_args, depth + 1)?;
                            if values.len() != results.len() {
                                return Err(HalError::Internal(format!(
                                    "'{name}' produced {} result(s), caller expects {}",
                                    values.len(),
                                    results.len()
                                )));
                            }
                            for (r, value) in results.iter().zip(values) {
                                registers[usize::from(*r)] = Some(value);
                            }
                        }
                        Instruction::Return { values } => {
                            return values.iter().map(|r| read(&registers, *r, &function.name)).collect();
                        }
                    }
                }
                Err(HalError::Internal(format!(
                    "function '{}' fell off the end of its body",
                    function.name
                )))
            }
            _ => Err(HalError::Internal("call target does not match module kind".to_string())),
        }
    }

    fn signature_of(&self, module: usize, target: &Target) -> Result<FunctionSignature> {
        let linked = self
            .context
            .modules
            .get(module)
            .ok_or_else(|| HalError::Internal(format!("module index {module} is not linked")))?;
        let signature = match (&linked.module, target) {
            (ModuleRef::Native(native), Target::Native(function)) => native.lookup_function(function),
            (ModuleRef::Bytecode(bytecode), Target::Bytecode(index)) => {
                bytecode.function(*index).map(|f| f.signature.clone())
            }
            _ => None,
        };
        signature.ok_or_else(|| HalError::Internal("unresolvable call target".to_string()))
    }
}

fn read(registers: &[Option<Value>], r: u16, function: &str) -> Result<Value> {
    registers
        .get(usize::from(r))
        .and_then(Option::clone)
        .ok_or_else(|| HalError::FailedPrecondition(format!("function '{function}' reads register {r} before writing it")))
}
