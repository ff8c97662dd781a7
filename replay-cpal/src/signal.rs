//! Process signals as polled flags.
//!
//! SIGUSR1 requests an export; SIGINT and SIGTERM request shutdown. Handlers
//! only store to an atomic, so all real work happens on the polling thread.

use std::sync::atomic::{AtomicBool, Ordering};

use replay_core::models::error::ReplayError;

static TRIGGER_REQUESTED: AtomicBool = AtomicBool::new(false);
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_trigger(_: libc::c_int) {
    TRIGGER_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
extern "C" fn handle_shutdown(_: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install(signal: libc::c_int, name: &str, handler: extern "C" fn(libc::c_int)) -> Result<(), ReplayError> {
    unsafe {
        // SAFETY: the handler only stores to a static atomic, which is
        // async-signal-safe.
        let handler = handler as *const () as libc::sighandler_t;
        if libc::signal(signal, handler) == libc::SIG_ERR {
            return Err(ReplayError::ConfigurationError(format!(
                "failed to install {} handler: {}",
                name,
                std::io::Error::last_os_error()
            )));
        }
    }
    Ok(())
}

/// Install the trigger and shutdown handlers.
#[cfg(unix)]
pub fn install_handlers() -> Result<(), ReplayError> {
    install(libc::SIGUSR1, "SIGUSR1", handle_trigger)?;
    install(libc::SIGINT, "SIGINT", handle_shutdown)?;
    install(libc::SIGTERM, "SIGTERM", handle_shutdown)?;
    Ok(())
}

/// Without SIGUSR1, a line on stdin triggers an export instead. Closing stdin
/// requests shutdown.
#[cfg(not(unix))]
pub fn install_handlers() -> Result<(), ReplayError> {
    use std::io::BufRead;

    std::thread::Builder::new()
        .name("replay-stdin-trigger".into())
        .spawn(|| {
            for line in std::io::stdin().lock().lines() {
                if line.is_err() {
                    break;
                }
                TRIGGER_REQUESTED.store(true, Ordering::SeqCst);
            }
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        })
        .map_err(|e| ReplayError::ConfigurationError(format!("failed to spawn trigger thread: {}", e)))?;
    Ok(())
}

/// Consume a pending trigger request.
pub fn take_trigger() -> bool {
    TRIGGER_REQUESTED.swap(false, Ordering::SeqCst)
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
