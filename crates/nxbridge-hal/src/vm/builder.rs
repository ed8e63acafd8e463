//! Programmatic construction of bytecode modules
//!
//! ```rust
//! use nxbridge_hal::vm::{BytecodeModule, FunctionBuilder, ModuleBuilder};
//!
//! let mut module = ModuleBuilder::new("module");
//! let add = module.import("hal.elementwise.add", "0rr_r");
//! let main = module.add_function(
//!     FunctionBuilder::new("main", "0rr_r")
//!         .call_import(add, &[0, 1], &[2])
//!         .ret(&[2]),
//! );
//! module.export("main", main);
//!
//! let bytes = module.build().unwrap();
//! assert!(BytecodeModule::from_bytes(&bytes).is_ok());
//! ```

use super::bytecode::{
    encode_module, BytecodeModule, Callee, ExportDef, FunctionDef, ImportDef, Instruction, ModuleDef, Reg,
};
use super::signature::FunctionSignature;
use crate::error::Result;

/// Handle to an import added with [`ModuleBuilder::import`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportId(u32);

/// Handle to a function added with [`ModuleBuilder::add_function`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionId(u32);

/// Builds one function body; registers are sized automatically
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    name: String,
    cconv: String,
    register_count: u16,
    body: Vec<Instruction>,
}

impl FunctionBuilder {
    /// Start a function; arguments occupy registers `0..argument_count`
    pub fn new(name: impl Into<String>, cconv: impl Into<String>) -> Self {
        let cconv = cconv.into();
        let argument_count = FunctionSignature::parse(&cconv)
            .map(|sig| sig.argument_count())
            .unwrap_or(0);
        Self {
            name: name.into(),
            cconv,
            register_count: u16::try_from(argument_count).unwrap_or(u16::MAX),
            body: Vec::new(),
        }
    }

    fn touch(&mut self, registers: &[Reg]) {
        for &r in registers {
            self.register_count = self.register_count.max(r.saturating_add(1));
        }
    }

    pub fn const_i32(mut self, dst: Reg, value: i32) -> Self {
        self.touch(&[dst]);
        self.body.push(Instruction::ConstI32 { dst, value });
        self
    }

    pub fn const_i64(mut self, dst: Reg, value: i64) -> Self {
        self.touch(&[dst]);
        self.body.push(Instruction::ConstI64 { dst, value });
        self
    }

    pub fn mov(mut self, dst: Reg, src: Reg) -> Self {
        self.touch(&[dst, src]);
        self.body.push(Instruction::Move { dst, src });
        self
    }

    pub fn call_import(self, import: ImportId, args: &[Reg], results: &[Reg]) -> Self {
        self.call(Callee::Import(import.0), args, results)
    }

    pub fn call_function(self, function: FunctionId, args: &[Reg], results: &[Reg]) -> Self {
        self.call(Callee::Function(function.0), args, results)
    }

    fn call(mut self, callee: Callee, args: &[Reg], results: &[Reg]) -> Self {
        self.touch(args);
        self.touch(results);
        self.body.push(Instruction::Call {
            callee,
            args: args.to_vec(),
            results: results.to_vec(),
        });
        self
    }

    pub fn ret(mut self, values: &[Reg]) -> Self {
        self.touch(values);
        self.body.push(Instruction::Return {
            values: values.to_vec(),
        });
        self
    }
}

/// Builds a module container
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    def: ModuleDef,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: ModuleDef {
                name: name.into(),
                imports: Vec::new(),
                functions: Vec::new(),
                exports: Vec::new(),
            },
        }
    }

    /// Import the fully-qualified `name`; repeated imports share a slot
    pub fn import(&mut self, name: impl Into<String>, cconv: impl Into<String>) -> ImportId {
        let name = name.into();
        if let Some(index) = self.def.imports.iter().position(|i| i.name == name) {
            return ImportId(index as u32);
        }
        self.def.imports.push(ImportDef {
            name,
            cconv: cconv.into(),
        });
        ImportId((self.def.imports.len() - 1) as u32)
    }

    pub fn add_function(&mut self, function: FunctionBuilder) -> FunctionId {
        self.def.functions.push(FunctionDef {
            name: function.name,
            cconv: function.cconv,
            register_count: function.register_count,
            body: function.body,
        });
        FunctionId((self.def.functions.len() - 1) as u32)
    }

    pub fn export(&mut self, name: impl Into<String>, function: FunctionId) -> &mut Self {
        self.def.exports.push(ExportDef {
            name: name.into(),
            function: function.0,
        });
        self
    }

    /// Description assembled so far, unverified
    pub fn def(&self) -> &ModuleDef {
        &self.def
    }

    /// Verify and encode the module
    pub fn build(self) -> Result<Vec<u8>> {
        let bytes = encode_module(&self.def)?;
        BytecodeModule::from_def(self.def)?;
        Ok(bytes)
    }
}
