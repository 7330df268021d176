//! Owned device object handles.
//!
//! [`GlObject`] is the single ownership primitive underneath every wrapper:
//! one non-null numeric identifier, released through the kind-specific
//! destroy call exactly once. Handles are move-only; Rust's destructive
//! moves give the transfer-and-null semantics directly, so there is no
//! swap dance and no way to alias an identifier.

use crate::backend::types::ObjectKind;
use crate::context::Context;
use crate::error::{GraphicsError, Result};

/// Exclusive owner of one device object.
pub struct GlObject {
    ctx: Context,
    kind: ObjectKind,
    id: u32,
}

impl GlObject {
    /// Allocate one device object of `kind` and take ownership of it.
    ///
    /// A null identifier from the device is an error; no empty handle state
    /// exists, so everything downstream may rely on `id() != 0`.
    pub fn create(ctx: &Context, kind: ObjectKind) -> Result<Self> {
        let id = ctx.backend().create_object(kind);
        if id == 0 {
            return Err(GraphicsError::ResourceCreationFailed(format!("{kind:?}")));
        }
        log::trace!("created {kind:?} #{id}");
        Ok(Self {
            ctx: ctx.clone(),
            kind,
            id,
        })
    }

    /// The raw identifier, for binding calls.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Drop for GlObject {
    fn drop(&mut self) {
        // id is non-null by construction; Drop runs at most once per owner.
        log::trace!("destroying {:?} #{}", self.kind, self.id);
        self.ctx.backend().delete_object(self.kind, self.id);
    }
}

impl std::fmt::Debug for GlObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlObject")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_drop() {
        let ctx = Context::headless();
        let obj = GlObject::create(&ctx, ObjectKind::Buffer).unwrap();
        assert_ne!(obj.id(), 0);
        assert_eq!(obj.kind(), ObjectKind::Buffer);
    }

    #[test]
    fn test_move_transfers_ownership() {
        let ctx = Context::headless();
        let a = GlObject::create(&ctx, ObjectKind::Texture).unwrap();
        let id = a.id();
        let b = a; // move; no second owner exists
        assert_eq!(b.id(), id);
    }
}
