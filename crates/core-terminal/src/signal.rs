//! SIGINT catch-and-continue.
//!
//! With ISIG left on, `^C` raises SIGINT. The handler only sets a flag; the
//! input source observes the interrupted wait, clears the flag and keeps
//! reading, so the line being edited survives.

use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Install the SIGINT handler once per process and return its flag.
pub fn install_interrupt_catch() -> io::Result<Arc<AtomicBool>> {
    if let Some(flag) = INTERRUPT_FLAG.get() {
        return Ok(Arc::clone(flag));
    }
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
    debug!(target: "input.signal", "sigint_handler_installed");
    Ok(Arc::clone(INTERRUPT_FLAG.get_or_init(|| flag)))
}
