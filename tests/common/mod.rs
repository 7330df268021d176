//! Shared test scaffolding.

use std::rc::Rc;

use glkit::backend::HeadlessBackend;
use glkit::Context;

/// Build a headless context and keep a handle to the backend so tests can
/// inspect device-side state after wrappers are dropped.
pub fn headless_context() -> (Context, Rc<HeadlessBackend>) {
    let backend = Rc::new(HeadlessBackend::new());
    (Context::new(backend.clone()), backend)
}
