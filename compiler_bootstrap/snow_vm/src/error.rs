use thiserror::Error;

/// The fault taxonomy the engine and its handlers can raise. A fault always
/// terminates the running program: the engine prints a diagnostic (operand
/// stack, call stack, fault instruction) and exits with a non-zero code: it
/// never attempts to resume past one.
#[derive(Debug, Error)]
pub enum FaultKind {
    #[error("opcode '{0}' has no registered handler")]
    UnknownOpcode(String),

    #[error("malformed instruction '{0}': {1}")]
    InvalidInstruction(String, String),

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("call stack exceeded its depth limit of {0}")]
    StackOverflow(usize),

    #[error("unknown resource handle {0}")]
    InvalidHandle(i64),

    #[error("resource registry exhausted its id space")]
    ResourceExhausted,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in {0}")]
    NumericOverflow(String),

    #[error("syscall {0} has no registered handler")]
    UnknownSyscall(i64),

    #[error("'{0}' is an acknowledged extension point with no implemented behavior")]
    Unimplemented(String),

    #[error("jump/call target {0} is outside the program")]
    LinkError(i64),
}

pub type VmResult<T> = std::result::Result<T, FaultKind>;
