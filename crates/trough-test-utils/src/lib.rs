//! Test utilities for Trough development.
//!
//! Blocking behaviour is awkward to test directly: a call that is supposed
//! to block can only be observed as "has not returned yet". [`Pending`]
//! runs such a call on its own thread and lets the test ask whether it is
//! still blocked or wait for it to finish; [`eventually`] polls a condition
//! until it holds.
//!
//! Fatal paths abort the whole process, so they are exercised in a child:
//! [`run_isolated`] re-runs a single test of the current test binary with
//! [`is_isolated_child`] set, and the parent inspects how the child died.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use trough_core::{BowlId, Species};

/// How long a pending call must stay blocked before the test believes it
/// is really waiting rather than slow to start.
pub const SETTLE: Duration = Duration::from_millis(50);

/// Upper bound for anything the test expects to happen.
pub const PATIENCE: Duration = Duration::from_secs(10);

// ── Pending ────────────────────────────────────────────────────────

/// A blocking call running on a helper thread.
pub struct Pending {
    label: String,
    done: Receiver<()>,
    finished: bool,
    handle: JoinHandle<()>,
}

impl Pending {
    /// Run `f` on a new thread named after `label`.
    pub fn spawn(label: impl Into<String>, f: impl FnOnce() + Send + 'static) -> Self {
        let label = label.into();
        let (tx, done) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                f();
                let _ = tx.send(());
            })
            .expect("failed to spawn helper thread");
        Self {
            label,
            done,
            finished: false,
            handle,
        }
    }

    /// Label used for the helper thread and in assertion messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait up to `timeout` for the call to return. Returns whether it did.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if !self.finished {
            match self.done.recv_timeout(timeout) {
                // A disconnect means the closure panicked; join reports it.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => self.finished = true,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        self.finished
    }

    /// Whether the call is still blocked after `SETTLE`.
    pub fn is_blocked(&mut self) -> bool {
        !self.wait(SETTLE)
    }

    /// Assert the call is still blocked.
    pub fn assert_blocked(&mut self) {
        assert!(self.is_blocked(), "{} returned but should be blocked", self.label);
    }

    /// Assert the call returns within `PATIENCE`.
    pub fn assert_finishes(&mut self) {
        assert!(self.wait(PATIENCE), "{} is still blocked", self.label);
    }

    /// Join the helper thread, resuming any panic from the call.
    pub fn join(self) {
        if let Err(panic) = self.handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
}

/// Poll `cond` until it returns true or `timeout` passes.
pub fn eventually(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// Thread label for an actor of `species` heading to `bowl`.
pub fn feeder_label(species: Species, bowl: BowlId) -> String {
    format!("{species}@{bowl}")
}

// ── Isolated child processes ───────────────────────────────────────

/// Set in the environment of a test binary re-run by [`run_isolated`].
pub const ISOLATED_TEST_ENV: &str = "TROUGH_ISOLATED_TEST";

/// Whether this process is the isolated re-run of a single test.
///
/// A test that exercises a fatal path does the fatal work only when this
/// is true, and otherwise calls [`run_isolated`] on itself.
pub fn is_isolated_child() -> bool {
    std::env::var_os(ISOLATED_TEST_ENV).is_some()
}

/// How an isolated child test ended.
#[derive(Debug)]
pub struct ChildRun {
    pub test: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ChildRun {
    /// Assert the child died by `abort` and wrote `diagnostic` to stderr.
    pub fn assert_aborted_with(&self, diagnostic: &str) {
        assert!(
            !self.status.success(),
            "{} finished normally but should have aborted\nstdout:\n{}",
            self.test,
            self.stdout
        );
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            const SIGABRT: i32 = 6;
            assert_eq!(
                self.status.signal(),
                Some(SIGABRT),
                "{} ended with {} rather than abort\nstderr:\n{}",
                self.test,
                self.status,
                self.stderr
            );
        }
        assert!(
            self.stderr.contains(diagnostic),
            "{} stderr lacks {diagnostic:?}:\n{}",
            self.test,
            self.stderr
        );
    }
}

/// Re-run the test at `test_path` alone in a fresh copy of the current
/// test binary and wait for it.
///
/// `test_path` is the name the harness lists: `module::tests::name` for
/// unit tests, the bare function name for integration tests.
pub fn run_isolated(test_path: &str) -> ChildRun {
    let exe = std::env::current_exe().expect("test binary path");
    let output = Command::new(exe)
        .args([test_path, "--exact", "--nocapture", "--test-threads=1"])
        .env(ISOLATED_TEST_ENV, test_path)
        .output()
        .expect("failed to run isolated test");
    ChildRun {
        test: test_path.to_owned(),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
