//! Contexts: an ordered set of linked modules
//!
//! Imports of each bytecode module resolve against the modules listed
//! before it, so dependencies come first (e.g. `[hal, module]`).

use super::instance::VmInstance;
use super::module::ModuleRef;
use super::signature::FunctionSignature;
use crate::error::{HalError, Result};
use std::sync::Arc;

/// Where a resolved function lives inside its module
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// Exported function of a native module
    Native(String),
    /// Function index of a bytecode module
    Bytecode(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedImport {
    pub module: usize,
    pub target: Target,
}

pub(crate) struct LinkedModule {
    pub module: ModuleRef,
    /// Parallel to the bytecode module's import table; empty for natives
    pub imports: Vec<ResolvedImport>,
}

/// Function resolved by fully-qualified name
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    pub(crate) module: usize,
    pub(crate) target: Target,
    signature: FunctionSignature,
}

impl Function {
    /// Fully-qualified name, e.g. `module.main`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }
}

/// Linked modules sharing one instance
pub struct Context {
    instance: Arc<VmInstance>,
    pub(crate) modules: Vec<LinkedModule>,
}

impl Context {
    /// Link `modules` in order.
    ///
    /// Fails with `ALREADY_EXISTS` on duplicate module names, `NOT_FOUND`
    /// on an unresolvable import and `INVALID_ARGUMENT` when an import's
    /// signature differs from the export it resolves to.
    pub fn create_with_modules(instance: Arc<VmInstance>, modules: Vec<ModuleRef>) -> Result<Self> {
        let mut context = Self {
            instance,
            modules: Vec::with_capacity(modules.len()),
        };
        for module in modules {
            if context.module_index(module.name()).is_some() {
                return Err(HalError::AlreadyExists(format!(
                    "module '{}' is already linked into the context",
                    module.name()
                )));
            }
            let imports = match &module {
                ModuleRef::Native(_) => Vec::new(),
                ModuleRef::Bytecode(bytecode) => bytecode
                    .imports()
                    .iter()
                    .map(|import| -> Result<ResolvedImport> {
                        let (resolved, signature) = context.lookup(&import.module, &import.function)?;
                        if signature != import.signature {
                            return Err(HalError::invalid_argument(format!(
                                "import '{}' declared as {} but exported as {}",
                                import.full_name(),
                                import.signature,
                                signature
                            )));
                        }
                        Ok(resolved)
                    })
                    .collect::<Result<Vec<_>>>()?,
            };
            tracing::trace!(module = module.name(), imports = imports.len(), "module_linked");
            context.modules.push(LinkedModule { module, imports });
        }
        Ok(context)
    }

    pub fn instance(&self) -> &Arc<VmInstance> {
        &self.instance
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.module.name())
    }

    /// Resolve `module.function`
    pub fn resolve_function(&self, full_name: &str) -> Result<Function> {
        let (module, function) = full_name
            .split_once('.')
            .ok_or_else(|| HalError::invalid_argument(format!("'{full_name}' is not a module-qualified name")))?;
        let (resolved, signature) = self.lookup(module, function)?;
        Ok(Function {
            name: full_name.to_string(),
            module: resolved.module,
            target: resolved.target,
            signature,
        })
    }

    fn module_index(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.module.name() == name)
    }

    fn lookup(&self, module: &str, function: &str) -> Result<(ResolvedImport, FunctionSignature)> {
        let not_found = || HalError::not_found(format!("function '{module}.{function}' not found"));
        let index = self.module_index(module).ok_or_else(not_found)?;
        match &self.modules[index].module {
            ModuleRef::Native(native) => {
                let signature = native.lookup_function(function).ok_or_else(not_found)?;
                Ok((
                    ResolvedImport {
                        module: index,
                        target: Target::Native(function.to_string()),
                    },
                    signature,
                ))
            }
            ModuleRef::Bytecode(bytecode) => {
                let function_index = bytecode.lookup_export(function).ok_or_else(not_found)?;
                let signature = bytecode
                    .function(function_index)
                    .map(|f| f.signature.clone())
                    .ok_or_else(not_found)?;
                Ok((
                    ResolvedImport {
                        module: index,
                        target: Target::Bytecode(function_index),
                    },
                    signature,
                ))
            }
        }
    }
}
