//! The stack-based virtual machine: loads the backend's textual program,
//! decodes each line into a dispatchable opcode, and runs it to completion
//! through a flat `pc`-driven interpreter loop over per-frame operand
//! stacks and local variable stores.

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod frame;
pub mod literal;
pub mod loader;
pub mod registries;
pub mod syscall;
pub mod value;

pub use config::VmConfig;
pub use engine::Engine;
pub use error::{FaultKind, VmResult};
pub use loader::load_program;
pub use value::Value;
