//! Asynchronous device queries.

use std::cell::Cell;

use crate::backend::types::{ObjectKind, QueryTarget};
use crate::context::Context;
use crate::error::Result;
use crate::handle::GlObject;

/// A timer/occlusion query.
///
/// `begin`/`end` bracket a device-timed region; the result is polled
/// non-blockingly, typically once per frame. A poll that finds the result
/// not yet ready leaves the previous reading untouched.
pub struct Query {
    gl: GlObject,
    target: QueryTarget,
    latest: Cell<u64>,
}

impl Query {
    pub fn new(ctx: &Context, target: QueryTarget) -> Result<Self> {
        let gl = GlObject::create(ctx, ObjectKind::Query)?;
        Ok(Self {
            gl,
            target,
            latest: Cell::new(0),
        })
    }

    pub fn begin(&self) {
        self.gl.context().backend().begin_query(self.target, self.gl.id());
    }

    pub fn end(&self) {
        self.gl.context().backend().end_query(self.target);
    }

    /// Non-blocking poll. Updates and returns the latest reading when the
    /// device has one; otherwise returns the previous reading.
    pub fn poll(&self) -> u64 {
        if let Some(value) = self.gl.context().backend().query_result(self.gl.id()) {
            self.latest.set(value);
        }
        self.latest.get()
    }

    /// The most recent reading, without touching the device.
    pub fn latest(&self) -> u64 {
        self.latest.get()
    }

    pub fn target(&self) -> QueryTarget {
        self.target
    }

    pub fn id(&self) -> u32 {
        self.gl.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_poll_keeps_previous_reading() {
        let ctx = Context::headless();
        let query = Query::new(&ctx, QueryTarget::TimeElapsed).unwrap();

        query.begin();
        query.end();
        let first = loop {
            let value = query.poll();
            if value != 0 {
                break value;
            }
        };

        // A new in-flight measurement must not disturb the reading until
        // the device publishes it.
        query.begin();
        query.end();
        assert_eq!(query.poll(), first); // result not ready yet
        assert_ne!(query.poll(), first); // now it is
    }
}
