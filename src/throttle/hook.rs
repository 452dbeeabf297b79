//! Notification hook invoked when the provider appears to block us.

use std::process::Command;
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{info, warn};

/// Details passed to a [`BlockedHook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEvent {
    /// What triggered the detection (empty result, HTTP 429, captcha, ...).
    pub reason: String,
    /// Mean delay after escalation.
    pub mean_delay: Duration,
    /// Blocks detected so far in this run, including this one.
    pub blocks_detected: u64,
}

/// Callback run synchronously on every detected block.
pub trait BlockedHook: Send + Sync {
    /// Handles a block event. Must not fail the run.
    fn on_blocked(&self, event: &BlockEvent);
}

impl<F> BlockedHook for F
where
    F: Fn(&BlockEvent) + Send + Sync,
{
    fn on_blocked(&self, event: &BlockEvent) {
        self(event);
    }
}

/// Runs a shell command on every block.
///
/// The command sees `BIBDL_BLOCK_REASON` and `BIBDL_MEAN_DELAY_MS` in its
/// environment. Spawn failures and non-zero exits are logged and ignored.
///
/// The run waits for the command to exit before the next provider call. On a
/// multi-thread runtime the wait happens in [`tokio::task::block_in_place`],
/// so other tasks on the same worker keep running.
#[derive(Debug, Clone)]
pub struct CommandHook {
    command: String,
}

impl CommandHook {
    /// Creates a hook running `command` through the platform shell.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The configured command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    fn shell_command(&self) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        }
    }
}

impl BlockedHook for CommandHook {
    fn on_blocked(&self, event: &BlockEvent) {
        let mut command = self.shell_command();
        command
            .env("BIBDL_BLOCK_REASON", &event.reason)
            .env(
                "BIBDL_MEAN_DELAY_MS",
                event.mean_delay.as_millis().to_string(),
            );
        match wait_blocking(|| command.status()) {
            Ok(status) if status.success() => {
                info!(command = %self.command, "on-blocked hook completed");
            }
            Ok(status) => {
                warn!(command = %self.command, code = ?status.code(), "on-blocked hook exited with failure");
            }
            Err(error) => {
                warn!(command = %self.command, error = %error, "failed to run on-blocked hook");
            }
        }
    }
}

/// Runs `f` where blocking the calling thread is allowed.
///
/// `block_in_place` panics on a current-thread runtime, so there `f` runs
/// inline.
fn wait_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
