//! Parent-process liveness watch and process-title cosmetics.
//!
//! The watch exists so the client never outlives an orchestrating parent. It
//! shares nothing with the streaming loop except the one-shot termination
//! signal.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time;
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether `pid` refers to a live process.
///
/// Errors other than "no such process" count as alive: if the probe cannot
/// tell (e.g. EPERM), the watchdog must not take down a healthy client.
pub fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Poll `pid` once per second on an independent task. The returned one-shot
/// fires exactly once when the parent disappears; the receiver treats it like
/// an interrupt.
pub fn spawn_parent_watch(pid: i32) -> oneshot::Receiver<()> {
    spawn_parent_watch_with_interval(pid, POLL_INTERVAL)
}

fn spawn_parent_watch_with_interval(pid: i32, poll_interval: Duration) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        loop {
            time::sleep(poll_interval).await;
            if !process_alive(pid) {
                warn!(pid, "parent process exited, requesting shutdown");
                let _ = tx.send(());
                return;
            }
        }
    });

    rx
}

/// Set the kernel-visible process name, where the platform allows it.
#[cfg(target_os = "linux")]
pub fn set_process_title(name: &str) {
    if let Ok(name) = std::ffi::CString::new(name) {
        unsafe {
            libc::prctl(libc::PR_SET_NAME, name.as_ptr());
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_process_title(_name: &str) {}
