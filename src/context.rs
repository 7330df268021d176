//! Graphics context.
//!
//! [`Context`] is the shared entry point every wrapper holds on to. It owns
//! the backend and the device-error drain. The whole layer is
//! single-threaded by contract, so the backend is reference-counted with
//! `Rc` and nothing here is `Send`.

use std::rc::Rc;

use crate::backend::types::Capability;
use crate::backend::{GlBackend, HeadlessBackend};

/// Cheap, clonable handle to the device backend.
///
/// Every resource wrapper stores a `Context` clone so destruction can reach
/// the device from `Drop`.
#[derive(Clone)]
pub struct Context {
    backend: Rc<dyn GlBackend>,
}

impl Context {
    /// Wrap an existing backend.
    pub fn new(backend: Rc<dyn GlBackend>) -> Self {
        log::info!("graphics context created ({})", backend.name());
        Self { backend }
    }

    /// Create a context over the CPU emulation backend. Used by the test
    /// suite and available for driver-free development.
    pub fn headless() -> Self {
        Self::new(Rc::new(HeadlessBackend::new()))
    }

    /// Raw backend access for the wrapper layer.
    pub(crate) fn backend(&self) -> &dyn GlBackend {
        self.backend.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Drain pending device errors into the log. Returns how many were
    /// pending. Advisory only; no recovery is attempted.
    pub fn poll_errors(&self) -> usize {
        let mut count = 0;
        while let Some(err) = self.backend.poll_error() {
            log::warn!("device error: {err}");
            count += 1;
        }
        count
    }

    /// Whether two contexts share one backend instance.
    pub fn same_backend(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.backend, &other.backend)
    }

    /// Enable a fixed-function capability.
    pub fn enable(&self, capability: Capability) {
        self.backend.enable(capability);
    }

    /// Disable a fixed-function capability.
    pub fn disable(&self, capability: Capability) {
        self.backend.disable(capability);
    }

    /// Set the rasterizer viewport rectangle.
    pub fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.backend.set_viewport(x, y, width, height);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_context() {
        let ctx = Context::headless();
        assert_eq!(ctx.backend_name(), "headless");
        assert_eq!(ctx.poll_errors(), 0);
    }

    #[test]
    fn test_same_backend() {
        let ctx = Context::headless();
        let clone = ctx.clone();
        assert!(ctx.same_backend(&clone));
        assert!(!ctx.same_backend(&Context::headless()));
    }
}
