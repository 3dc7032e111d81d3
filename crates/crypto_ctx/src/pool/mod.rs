// Copyright (C) Microsoft Corporation. All rights reserved.

//! Context pool: admission control, blocking acquire, return-or-destroy release.
//!
//! The pool keeps a set of idle contexts and a counter of contexts that are
//! allocated or reserved. Acquire serves from the idle set when it can, grows
//! by one context while the counter is within the target concurrency bound,
//! and otherwise blocks until a context is returned. Release pools the context
//! while the counter is within the bound and destroys it otherwise, which is
//! how the pool shrinks back after a burst.
//!
//! The bound is advisory. It is re-read on every decision and may change
//! between the check in acquire and the matching check in release, so the
//! pool can briefly hold a context or two more than the bound. It never grows
//! without limit under sustained contention.
//!
//! The idle set and the counter live under one mutex that is held only for
//! the O(1) bookkeeping; contexts are built and destroyed outside it.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use tracing::instrument;

use crate::ConcurrencyBound;
use crate::CryptoCtx;
use crate::CryptoCtxError;
use crate::CryptoProvider;
use crate::PoolConfig;

mod find;
mod guard;

pub use guard::*;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Target concurrency bound at the time of the snapshot.
    pub bound: usize,
    /// Contexts currently idle in the pool.
    pub idle: usize,
    /// Allocated-or-reserved counter.
    pub allocated: usize,
    /// Contexts currently checked out by callers.
    pub checked_out: usize,
    /// Contexts ever constructed by this pool.
    pub created: u64,
    /// Contexts destroyed by this pool.
    pub destroyed: u64,
}

struct PoolState<P: CryptoProvider> {
    idle: Vec<CryptoCtx<P>>,
    avail: usize,
}

/// Bounded pool of reusable crypto contexts.
///
/// Built once at server startup and shared by reference with every worker
/// (wrap it in an `Arc` to share across spawned threads). Acquired contexts
/// borrow the pool, so the pool outlives every context checked out of it.
pub struct CtxPool<P: CryptoProvider> {
    provider: P,
    bound: ConcurrencyBound,
    state: Mutex<PoolState<P>>,
    idle_wait: Condvar,
    next_id: AtomicU64,
    created: AtomicU64,
    destroyed: AtomicU64,
    checked_out: AtomicUsize,
}

impl<P: CryptoProvider> CtxPool<P> {
    /// Initializes the pool with one idle seed context.
    ///
    /// # Arguments
    ///
    /// * `provider` - The cryptographic provider engine handles come from
    /// * `config` - Pool configuration
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::OutOfMemory` - The seed context could not be built.
    #[instrument(skip_all, fields(bound = ?config.bound))]
    pub fn new(provider: P, config: PoolConfig) -> Result<Self, CryptoCtxError> {
        let pool = Self {
            provider,
            bound: config.bound,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                avail: 1,
            }),
            idle_wait: Condvar::new(),
            next_id: AtomicU64::new(0),
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            checked_out: AtomicUsize::new(0),
        };

        let seed = pool.new_ctx().inspect_err(|error| {
            tracing::error!(%error, "Failed to build seed crypto context");
        })?;
        pool.state.lock().idle.push(seed);

        tracing::info!(bound = pool.bound.current(), "Crypto context pool initialized");
        Ok(pool)
    }

    /// The provider engine handles are built from.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Current value of the target concurrency bound.
    pub fn bound(&self) -> usize {
        self.bound.current()
    }

    /// Takes a context out of the pool, blocking while none is available.
    ///
    /// Serves an idle context if there is one. Otherwise builds a new context
    /// if the allocated-or-reserved counter has not passed the bound, and
    /// blocks until a context is released if it has (or if building failed).
    /// There is no timeout.
    pub fn acquire(&self) -> PooledCtx<'_, P> {
        let ctx = self.find_ctx();
        self.checked_out.fetch_add(1, Ordering::Relaxed);
        PooledCtx::new(self, ctx)
    }

    /// Returns a context to the pool. `None` is a no-op.
    ///
    /// Equivalent to dropping the guard.
    pub fn release(&self, ctx: Option<PooledCtx<'_, P>>) {
        if let Some(ctx) = ctx {
            debug_assert!(std::ptr::eq(ctx.pool(), self), "context released to foreign pool");
            drop(ctx);
        }
    }

    /// Destroys every idle context.
    ///
    /// Contexts still checked out are not touched; when they are released
    /// later they return to the pool and are destroyed with it.
    ///
    /// # Returns
    ///
    /// The number of contexts destroyed.
    #[instrument(skip_all)]
    pub fn shutdown(&self) -> usize {
        let idle = {
            let mut state = self.state.lock();
            let idle = std::mem::take(&mut state.idle);
            state.avail -= idle.len();
            idle
        };
        let count = idle.len();
        self.destroyed.fetch_add(count as u64, Ordering::Relaxed);
        drop(idle);

        let outstanding = self.checked_out.load(Ordering::Relaxed);
        if outstanding > 0 {
            tracing::warn!(outstanding, "Crypto contexts still checked out at shutdown");
        }
        tracing::info!(destroyed = count, "Crypto context pool shut down");
        count
    }

    /// Snapshot of the pool's occupancy.
    pub fn stats(&self) -> PoolStats {
        let (idle, allocated) = {
            let state = self.state.lock();
            (state.idle.len(), state.avail)
        };

        PoolStats {
            bound: self.bound.current(),
            idle,
            allocated,
            checked_out: self.checked_out.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
        }
    }

    fn new_ctx(&self) -> Result<CryptoCtx<P>, CryptoCtxError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let ctx = CryptoCtx::try_new(id)?;
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(ctx)
    }

    fn find_ctx(&self) -> CryptoCtx<P> {
        let mut state = self.state.lock();
        loop {
            if let Some(ctx) = state.idle.pop() {
                tracing::trace!(ctx = ctx.id(), "Reusing idle crypto context");
                return ctx;
            }

            let bound = self.bound.current();
            if state.avail > bound {
                tracing::debug!(avail = state.avail, bound, "Waiting for an idle crypto context");
                // Returns with the lock held and a context idle.
                self.wait_for_idle(&mut state);
                continue;
            }

            state.avail += 1;
            match MutexGuard::unlocked(&mut state, || self.new_ctx()) {
                Ok(ctx) => {
                    tracing::debug!(ctx = ctx.id(), bound, "Grew crypto context pool");
                    return ctx;
                }
                Err(error) => {
                    tracing::warn!(%error, "Crypto context allocation failed, waiting");
                    state.avail -= 1;
                    self.wait_for_idle(&mut state);
                }
            }
        }
    }

    fn wait_for_idle(&self, state: &mut MutexGuard<'_, PoolState<P>>) {
        while state.idle.is_empty() {
            self.idle_wait.wait(state);
        }
    }

    fn put_ctx(&self, ctx: CryptoCtx<P>) {
        self.checked_out.fetch_sub(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        if state.avail <= self.bound.current() {
            state.idle.push(ctx);
            drop(state);
            self.idle_wait.notify_one();
            return;
        }

        state.avail -= 1;
        drop(state);

        tracing::debug!(ctx = ctx.id(), "Shrinking crypto context pool");
        self.destroyed.fetch_add(1, Ordering::Relaxed);
        drop(ctx);
    }
}

impl<P: CryptoProvider> Drop for CtxPool<P> {
    fn drop(&mut self) {
        let idle = std::mem::take(&mut self.state.get_mut().idle);
        self.destroyed.fetch_add(idle.len() as u64, Ordering::Relaxed);
        tracing::debug!(destroyed = idle.len(), "Dropping crypto context pool");
    }
}

impl<P: CryptoProvider> std::fmt::Debug for CtxPool<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtxPool")
            .field("bound", &self.bound)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
