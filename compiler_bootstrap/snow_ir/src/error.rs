use thiserror::Error;

/// Errors raised while lowering an AST into an `IRProgram`. The IR builder
/// never recovers: the first error aborts `build_program`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("unsupported AST root kind: {0}")]
    InvalidAstShape(String),

    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
