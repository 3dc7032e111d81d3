// Copyright (C) Microsoft Corporation. All rights reserved.

//! Checked-out context guard.

use std::ops::Deref;
use std::ops::DerefMut;

use super::*;
use crate::AlgoId;

/// A crypto context checked out of a [`CtxPool`].
///
/// The holder has exclusive access to the context and may populate its slots
/// freely. Dropping the guard (or passing it to [`CtxPool::release`]) hands
/// the context back to the pool, which either keeps it idle or destroys it.
pub struct PooledCtx<'a, P: CryptoProvider> {
    pool: &'a CtxPool<P>,
    ctx: Option<CryptoCtx<P>>,
}

impl<'a, P: CryptoProvider> PooledCtx<'a, P> {
    pub(super) fn new(pool: &'a CtxPool<P>, ctx: CryptoCtx<P>) -> Self {
        Self {
            pool,
            ctx: Some(ctx),
        }
    }

    /// The pool this context came from.
    pub fn pool(&self) -> &'a CtxPool<P> {
        self.pool
    }

    /// Makes sure the handle for `algo` is cached, using the pool's provider.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::UnsupportedAlgorithm` - The family is not built in.
    /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built;
    ///   the context stays usable.
    pub fn ensure(&mut self, algo: AlgoId) -> Result<(), CryptoCtxError> {
        let pool = self.pool;
        self.deref_mut().ensure(&pool.provider, algo)
    }
}

impl<P: CryptoProvider> Deref for PooledCtx<'_, P> {
    type Target = CryptoCtx<P>;

    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the context out.
        self.ctx.as_ref().expect("pooled context already released")
    }
}

impl<P: CryptoProvider> DerefMut for PooledCtx<'_, P> {
    #[allow(clippy::expect_used)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx.as_mut().expect("pooled context already released")
    }
}

impl<P: CryptoProvider> Drop for PooledCtx<'_, P> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.put_ctx(ctx);
        }
    }
}

impl<P: CryptoProvider> std::fmt::Debug for PooledCtx<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledCtx").field(&self.ctx).finish()
    }
}
