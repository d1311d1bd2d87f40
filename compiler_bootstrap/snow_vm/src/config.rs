use serde::{Deserialize, Serialize};

/// Engine tunables loaded from a TOML config file (or defaults when none is
/// given). None of these affect program semantics; they bound resource
/// usage and control diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Maximum number of frames the call stack may hold before `CALL`
    /// fails with `StackOverflow`.
    pub call_stack_limit: usize,
    /// Maximum number of values a single frame's operand stack may hold.
    pub operand_stack_limit: usize,
    /// Log every executed instruction at `trace` level when set.
    pub trace_instructions: bool,
    /// Starting id handed out by the unified fd/socket allocator; ids below
    /// this are reserved (0/1/2 for stdin/stdout/stderr).
    pub first_user_fd: i64,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            call_stack_limit: 1024,
            operand_stack_limit: 65536,
            trace_instructions: false,
            first_user_fd: 3,
        }
    }
}

impl VmConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
