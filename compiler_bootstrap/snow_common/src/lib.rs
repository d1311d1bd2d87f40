//! Shared scalar-width and constant-value vocabulary used by the IR, backend
//! and VM crates, plus a small logging init helper each binary/test harness
//! can call once.

pub mod logging;
pub mod value;

pub use value::{widen, ConstantValue, Width};
