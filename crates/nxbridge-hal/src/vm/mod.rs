//! Bytecode virtual machine
//!
//! Execution is organised the same way at every layer:
//!
//! ```text
//! VmInstance ── type registry (HAL reference types)
//!     │
//!     ▼
//! Context ── [HalModule(device), BytecodeModule, ...]   imports linked in order
//!     │
//!     ▼
//! resolve_function("module.main") ── FunctionSignature from its cconv
//!     │
//!     ▼
//! invoke(inputs: VariantList) ── outputs: VariantList
//! ```

pub mod builder;
pub mod bytecode;
pub mod context;
pub mod hal_module;
pub mod instance;
pub mod interpreter;
pub mod module;
pub mod signature;
pub mod value;

pub use builder::{FunctionBuilder, FunctionId, ImportId, ModuleBuilder};
pub use bytecode::{BytecodeModule, ModuleDef};
pub use context::{Context, Function};
pub use hal_module::{ExecutionMode, HalModule};
pub use instance::{register_all_hal_types, VmInstance, DEFAULT_TYPE_CAPACITY};
pub use interpreter::invoke;
pub use module::{ModuleRef, NativeModule};
pub use signature::FunctionSignature;
pub use value::{Value, ValueKind, VariantList};
