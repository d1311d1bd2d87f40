//! Lowers the typed SSA intermediate representation into the flat textual
//! program the virtual machine executes: slot allocation, per-instruction
//! lowering (with the `ADD 0 -> MOV` peephole and the comparison-as-value
//! push-0/push-1 dance), and the two-pass label/call address fix-up.

pub mod error;
pub mod lower;
pub mod slots;

pub use error::{LowerError, LowerResult};
pub use lower::lower_program;
