//! The typed three-address SSA intermediate representation: instruction and
//! value vocabulary, per-function and per-program containers, the global
//! process-wide tables, and the stateless AST-to-IR builder.

pub mod ast;
pub mod builder;
pub mod error;
pub mod function;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod register;
pub mod scope;
pub mod tables;
pub mod typenames;

pub use builder::build_program;
pub use error::{BuildError, BuildResult};
pub use function::IRFunction;
pub use instruction::{Instruction, Operand};
pub use opcode::{BinOp, CmpOp, Conversion, UnOp};
pub use program::IRProgram;
pub use register::{Label, VReg};
pub use tables::{GlobalConstantTable, GlobalFunctionTable, StructLayout, StructLayoutTable};
