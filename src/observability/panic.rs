//! Panic capture for the request error boundary.
//!
//! The hook records the panic message, location and a backtrace in a
//! thread-local slot. `catch_unwind` returns on the thread that panicked,
//! so the boundary reads the slot right after catching.
//!
//! Panics raised while a [`contained`] future is being polled are owned by
//! the boundary and are not forwarded to the previous hook, so nothing but
//! the JSON log reaches the process output for them.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::{poll_fn, Future};
use std::panic;
use std::pin::pin;
use std::sync::Once;

/// What the hook saw for the most recent panic on this thread.
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: String,
    /// Raised inside a [`contained`] future.
    pub contained: bool,
}

impl PanicReport {
    /// Formatted trace for the `exception` log field.
    pub fn exception(&self) -> String {
        match &self.location {
            Some(location) => format!(
                "panicked at {}: {}\n{}",
                location, self.message, self.backtrace
            ),
            None => format!("panicked: {}\n{}", self.message, self.backtrace),
        }
    }
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static INSTALL: Once = Once::new();

/// Install the capturing hook. Panics outside a [`contained`] future are
/// still passed on to whatever hook was set before.
///
/// Idempotent.
pub fn install_panic_capture() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let contained = BOUNDARY_DEPTH.with(Cell::get) > 0;
            let report = PanicReport {
                message: payload_message(info.payload()),
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture().to_string(),
                contained,
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(report));
            if !contained {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as inside the error boundary until dropped.
///
/// The outermost scope on a thread clears any report left by a panic that
/// happened outside the boundary. `resume_unwind` bypasses the hook, so a
/// stale report would otherwise be attributed to it.
struct BoundaryScope;

impl BoundaryScope {
    fn enter() -> Self {
        let outermost = BOUNDARY_DEPTH.with(|depth| {
            let current = depth.get();
            depth.set(current + 1);
            current == 0
        });
        if outermost {
            let _ = take_last_panic();
        }
        BoundaryScope
    }
}

impl Drop for BoundaryScope {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Drive `future` with panics raised during each poll reported only to the
/// capture slot. The future must catch its own panics; this does not.
pub async fn contained<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    poll_fn(|cx| {
        let _scope = BoundaryScope::enter();
        future.as_mut().poll(cx)
    })
    .await
}

/// Take the report left by the last panic on the current thread.
pub fn take_last_panic() -> Option<PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Best-effort text of a panic payload.
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
