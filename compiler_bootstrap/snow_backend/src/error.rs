use thiserror::Error;

/// Errors raised while lowering an `IRProgram` into textual VM bytecode.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LowerError {
    #[error("program has no functions to lower")]
    EmptyProgram,

    #[error("jump target label '{0}' is never defined in its owning function")]
    UnresolvedLabel(String),

    #[error("call target '{0}' does not resolve to any function in the program")]
    UnresolvedFunction(String),

    #[error("register %{0} used in '{1}' has no recorded type")]
    UnknownRegisterType(u32, String),
}

pub type LowerResult<T> = std::result::Result<T, LowerError>;
