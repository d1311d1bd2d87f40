//! Thin wrapper around `env_logger` so every crate/binary initializes
//! logging the same way instead of reaching for `env_logger::init()`
//! directly at a dozen call sites.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the global logger exactly once. Safe to call from multiple
/// binaries/tests; subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::try_init();
    });
}
