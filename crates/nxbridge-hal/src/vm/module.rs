//! Modules linked into a context

use super::bytecode::BytecodeModule;
use super::signature::FunctionSignature;
use super::value::Value;
use crate::error::Result;
use std::sync::Arc;

/// Module implemented in Rust, e.g. the HAL module
pub trait NativeModule: Send + Sync {
    fn name(&self) -> &str;

    /// Names of the exported functions, without the module prefix
    fn export_names(&self) -> Vec<String>;

    /// Signature of the exported function `function`
    fn lookup_function(&self, function: &str) -> Option<FunctionSignature>;

    /// Call `function`; `args` already match its signature
    fn call(&self, function: &str, args: &[Value]) -> Result<Vec<Value>>;
}

/// A module ready to be linked into a context
#[derive(Clone)]
pub enum ModuleRef {
    Native(Arc<dyn NativeModule>),
    Bytecode(Arc<BytecodeModule>),
}

impl ModuleRef {
    pub fn name(&self) -> &str {
        match self {
            ModuleRef::Native(module) => module.name(),
            ModuleRef::Bytecode(module) => module.name(),
        }
    }
}

impl From<BytecodeModule> for ModuleRef {
    fn from(module: BytecodeModule) -> Self {
        ModuleRef::Bytecode(Arc::new(module))
    }
}
