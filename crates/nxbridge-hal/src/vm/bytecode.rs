//! Bytecode module container
//!
//! ```text
//! ┌────────┬─────────────┬──────────────────────────────┐
//! │ "NXBC" │ version u32 │ bincode(ModuleDef)           │
//! │ 4 bytes│ LE          │                              │
//! └────────┴─────────────┴──────────────────────────────┘
//! ```
//!
//! Parsing verifies the whole module up front: calling conventions, register
//! bounds, import and function indices, and that every body ends in a
//! `Return` matching its result count. Execution can then trust the module.

use super::signature::FunctionSignature;
use crate::error::{HalError, Result};
use serde::{Deserialize, Serialize};

pub const MAGIC: [u8; 4] = *b"NXBC";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

/// Register index within a function frame
pub type Reg = u16;

/// Target of a call instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Callee {
    /// Index into the module's imports
    Import(u32),
    /// Index into the module's functions
    Function(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    ConstI32 { dst: Reg, value: i32 },
    ConstI64 { dst: Reg, value: i64 },
    Move { dst: Reg, src: Reg },
    Call { callee: Callee, args: Vec<Reg>, results: Vec<Reg> },
    Return { values: Vec<Reg> },
}

/// Fully-qualified function imported from another module, e.g.
/// `hal.elementwise.add`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDef {
    pub name: String,
    pub cconv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub cconv: String,
    /// Arguments arrive in registers `0..argument_count`
    pub register_count: u16,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDef {
    pub name: String,
    pub function: u32,
}

/// Serialized description of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    pub imports: Vec<ImportDef>,
    pub functions: Vec<FunctionDef>,
    pub exports: Vec<ExportDef>,
}

/// Import with its parsed signature
#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub function: String,
    pub signature: FunctionSignature,
}

impl Import {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.module, self.function)
    }
}

/// Function with its parsed signature
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub signature: FunctionSignature,
    pub register_count: usize,
    pub body: Vec<Instruction>,
}

/// A verified bytecode module
#[derive(Debug, Clone)]
pub struct BytecodeModule {
    name: String,
    imports: Vec<Import>,
    functions: Vec<Function>,
    exports: Vec<ExportDef>,
}

impl BytecodeModule {
    /// Parse and verify a module container
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(HalError::InvalidModule(format!(
                "{} bytes is too short for a module header",
                bytes.len()
            )));
        }
        if bytes[..4] != MAGIC {
            return Err(HalError::InvalidModule("bad magic; not an NXBC module".to_string()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(HalError::InvalidModule(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let def: ModuleDef = bincode::deserialize(&bytes[HEADER_LEN..])?;
        Self::from_def(def)
    }

    /// Verify `def` and build the module
    pub fn from_def(def: ModuleDef) -> Result<Self> {
        if def.name.is_empty() || def.name.contains('.') {
            return Err(HalError::InvalidModule(format!(
                "module name '{}' must be non-empty and contain no '.'",
                def.name
            )));
        }

        let imports = def
            .imports
            .iter()
            .map(|import| -> Result<Import> {
                let (module, function) = import.name.split_once('.').ok_or_else(|| {
                    HalError::InvalidModule(format!("import '{}' is not module-qualified", import.name))
                })?;
                Ok(Import {
                    module: module.to_string(),
                    function: function.to_string(),
                    signature: FunctionSignature::parse(&import.cconv)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let functions = def
            .functions
            .into_iter()
            .map(|f| -> Result<Function> {
                Ok(Function {
                    signature: FunctionSignature::parse(&f.cconv)?,
                    register_count: usize::from(f.register_count),
                    name: f.name,
                    body: f.body,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let module = Self {
            name: def.name,
            imports,
            functions,
            exports: def.exports,
        };
        module.verify()?;
        Ok(module)
    }

    fn verify(&self) -> Result<()> {
        for export in &self.exports {
            if export.function as usize >= self.functions.len() {
                return Err(HalError::InvalidModule(format!(
                    "export '{}' references undefined function {}",
                    export.name, export.function
                )));
            }
        }
        for function in &self.functions {
            self.verify_function(function)?;
        }
        Ok(())
    }

    fn verify_function(&self, function: &Function) -> Result<()> {
        let fail = |msg: String| HalError::InvalidModule(format!("function '{}': {msg}", function.name));
        let reg = |r: Reg| -> Result<()> {
            if usize::from(r) < function.register_count {
                Ok(())
            } else {
                Err(fail(format!(
                    "register {r} out of range for {} registers",
                    function.register_count
                )))
            }
        };

        if function.signature.argument_count() > function.register_count {
            return Err(fail(format!(
                "{} arguments do not fit in {} registers",
                function.signature.argument_count(),
                function.register_count
            )));
        }
        match function.body.last() {
            Some(Instruction::Return { .. }) => {}
            _ => return Err(fail("body does not end in a return".to_string())),
        }

        for instruction in &function.body {
            match instruction {
                Instruction::ConstI32 { dst, .. } | Instruction::ConstI64 { dst, .. } => reg(*dst)?,
                Instruction::Move { dst, src } => {
                    reg(*dst)?;
                    reg(*src)?;
                }
                Instruction::Call { callee, args, results } => {
                    let signature = self.callee_signature(*callee).ok_or_else(|| {
                        fail(format!("call to undefined {callee:?}"))
                    })?;
                    if args.len() != signature.argument_count() || results.len() != signature.result_count() {
                        return Err(fail(format!(
                            "call to {callee:?} passes {} argument(s) and {} result(s), callee takes {}",
                            args.len(),
                            results.len(),
                            signature
                        )));
                    }
                    args.iter().chain(results).try_for_each(|r| reg(*r))?;
                }
                Instruction::Return { values } => {
                    if values.len() != function.signature.result_count() {
                        return Err(fail(format!(
                            "returns {} value(s), signature declares {}",
                            values.len(),
                            function.signature.result_count()
                        )));
                    }
                    values.iter().try_for_each(|r| reg(*r))?;
                }
            }
        }
        Ok(())
    }

    fn callee_signature(&self, callee: Callee) -> Option<&FunctionSignature> {
        match callee {
            Callee::Import(i) => self.imports.get(i as usize).map(|i| &i.signature),
            Callee::Function(f) => self.functions.get(f as usize).map(|f| &f.signature),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    /// Index of the function exported as `name`
    pub fn lookup_export(&self, name: &str) -> Option<usize> {
        self.exports
            .iter()
            .find(|export| export.name == name)
            .map(|export| export.function as usize)
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|e| e.name.as_str())
    }
}

/// Serialize `def` into a module container
pub fn encode_module(def: &ModuleDef) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + 64);
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bincode::serialize_into(&mut bytes, def)?;
    Ok(bytes)
}
