//! The failure channel: a non-local exit from a failing assertion back to the
//! boundary of the test attempt that is currently running.
//!
//! [`attempt`] arms a window on the current thread and runs a closure inside it.
//! [`fire`] records a [`Failure`] in the armed window and unwinds straight back to
//! the end of that `attempt`. The unwind uses [`std::panic::resume_unwind`], which
//! skips the panic hook, so a failing assertion prints nothing beyond what the
//! reporter renders for it. Other panics raised while a window is armed are
//! kept off stderr as well; panics outside any window reach the previous hook.

use std::{
    any::Any,
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

use crate::{
    assertions::{Mismatch, SourceLocation},
    error::Error,
    trace_categories,
};

/// A failed test attempt: where it failed and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Call site of the failing assertion; unknown for foreign panics.
    pub location: Option<SourceLocation>,
    /// What did not match.
    pub mismatch: Mismatch,
}

impl Failure {
    /// Creates a failure raised at `location`.
    pub const fn new(location: SourceLocation, mismatch: Mismatch) -> Self {
        Self {
            location: Some(location),
            mismatch,
        }
    }

    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };

        Self {
            location: None,
            mismatch: Mismatch::Panic(message),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.mismatch),
            None => write!(f, "{}", self.mismatch),
        }
    }
}

/// Result of one armed test attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The closure returned normally and nothing fired.
    Passed,
    /// An assertion fired, or the closure panicked.
    Failed(Failure),
}

/// Unwind payload marking a deliberate exit through the channel.
struct FailureSignal;

#[derive(Default)]
struct Window {
    failure: Option<Failure>,
}

thread_local! {
    static WINDOW: RefCell<Option<Window>> = const { RefCell::new(None) };
}

static QUIET_HOOK: Once = Once::new();

/// Wraps the process panic hook so that it stays silent inside armed windows.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !armed_for_hook() {
                previous(info);
            }
        }));
    });
}

// Must not panic: runs inside the hook, possibly while the window is borrowed
// or the thread's locals are being torn down.
fn armed_for_hook() -> bool {
    WINDOW
        .try_with(|window| window.try_borrow().is_ok_and(|window| window.is_some()))
        .unwrap_or(false)
}

/// Keeps the window armed for as long as it lives.
struct ArmedWindow(());

impl ArmedWindow {
    fn arm() -> Result<Self, Error> {
        install_quiet_hook();

        WINDOW.with_borrow_mut(|window| {
            if window.is_some() {
                return Err(Error::ReentrantAttempt);
            }
            *window = Some(Window::default());
            Ok(())
        })?;

        tracing::debug!(target: trace_categories::FAILURE, "armed");
        Ok(Self(()))
    }

    fn disarm(self) -> Option<Failure> {
        WINDOW
            .with_borrow_mut(Option::take)
            .and_then(|window| window.failure)
    }
}

impl Drop for ArmedWindow {
    fn drop(&mut self) {
        WINDOW.with_borrow_mut(|window| *window = None);
    }
}

/// Returns whether a test attempt is currently running on this thread.
pub fn is_armed() -> bool {
    WINDOW.with_borrow(Option::is_some)
}

/// Runs `body` inside a freshly armed window.
///
/// Any panic escaping `body` is contained here; one raised by [`fire`] carries the
/// recorded failure, anything else is reported with its panic message. The panic
/// hook is not run for panics contained this way.
pub fn attempt(body: impl FnOnce()) -> Result<AttemptOutcome, Error> {
    let window = ArmedWindow::arm()?;
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    let fired = window.disarm();

    let outcome = match (result, fired) {
        (_, Some(failure)) => AttemptOutcome::Failed(failure),
        (Ok(()), None) => AttemptOutcome::Passed,
        (Err(payload), None) => AttemptOutcome::Failed(Failure::from_panic(payload.as_ref())),
    };

    Ok(outcome)
}

/// Records `failure` in the armed window and unwinds to the end of the running
/// [`attempt`].
///
/// Only the first failure of an attempt is kept.
///
/// # Panics
///
/// Panics with the failure's description when no attempt is running, which is
/// how assertions behave outside the harness (e.g. under `cargo test`).
pub fn fire(failure: Failure) -> ! {
    let unrecorded = WINDOW.with_borrow_mut(|window| match window {
        Some(window) => {
            tracing::debug!(target: trace_categories::FAILURE, "fired: {failure}");
            if window.failure.is_none() {
                window.failure = Some(failure);
            }
            None
        }
        None => Some(failure),
    });

    if let Some(failure) = unrecorded {
        panic_outside_window(&failure);
    }

    panic::resume_unwind(Box::new(FailureSignal))
}

// Assertions used outside the harness fail the way `assert!` would.
#[allow(clippy::panic)]
fn panic_outside_window(failure: &Failure) -> ! {
    panic!("{failure}")
}
