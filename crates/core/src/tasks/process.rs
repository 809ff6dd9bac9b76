//! Graceful termination of a running task process.
//!
//! On Unix the child first receives SIGTERM and gets a grace period to exit
//! before it is killed. Elsewhere the child is killed immediately.
//!
//! Children stay in tend's process group so an interactive task keeps
//! terminal access; a Ctrl-C typed at the terminal therefore reaches the
//! child directly as well.

use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, warn};

/// Grace period between SIGTERM and SIGKILL.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(3);

/// Stop `child`, waiting at most `grace` for it to exit on its own.
///
/// Returns the exit status if the process could be reaped.
pub async fn terminate(child: &mut Child, task: &str, grace: Duration) -> Option<ExitStatus> {
    if let Some(pid) = child.id() {
        debug!(pid, task, "Sending SIGTERM");
        send_term_signal(pid);
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(task, ?status, "Process exited after SIGTERM");
            Some(status)
        }
        Ok(Err(err)) => {
            warn!(task, error = %err, "Failed to wait for terminated process");
            None
        }
        Err(_) => {
            warn!(task, "Force killing process after grace period");
            if let Err(err) = child.kill().await {
                warn!(task, error = %err, "Failed to kill process");
                return None;
            }
            child.wait().await.ok()
        }
    }
}

/// Whether `status` reports death by SIGINT, the signal a terminal Ctrl-C
/// delivers to the whole foreground process group.
#[cfg(unix)]
#[must_use]
pub fn interrupted(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(libc::SIGINT)
}

/// Whether `status` reports death by SIGINT. Never true off Unix.
#[cfg(not(unix))]
#[must_use]
pub const fn interrupted(_status: &ExitStatus) -> bool {
    false
}

/// Sends SIGTERM to a single process.
#[cfg(unix)]
fn send_term_signal(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; `pid` belongs to a
    // child we spawned and have not reaped yet.
    #[expect(unsafe_code, reason = "Required for POSIX signal handling")]
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
}

/// No soft termination signal off Unix; the grace timeout falls through to
/// a hard kill.
#[cfg(not(unix))]
const fn send_term_signal(_pid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Instant;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_terminate_stops_sleeping_process() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        let started = Instant::now();
        let status = terminate(&mut child, "sleep", Duration::from_secs(5)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        let status = status.unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), None);
    }

    #[tokio::test]
    async fn test_interrupted_detects_sigint_only() {
        let by_sigint = Command::new("sh")
            .args(["-c", "kill -INT $$"])
            .status()
            .await
            .unwrap();
        assert!(interrupted(&by_sigint));

        let by_exit = Command::new("sh").args(["-c", "exit 2"]).status().await.unwrap();
        assert!(!interrupted(&by_exit));
    }

    #[tokio::test]
    async fn test_terminate_kills_process_ignoring_sigterm() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .spawn()
            .unwrap();
        // Give the shell time to install the trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = terminate(&mut child, "stubborn", Duration::from_millis(300)).await;
        assert!(!status.unwrap().success());
    }
}
