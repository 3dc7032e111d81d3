// Copyright (C) Microsoft Corporation. All rights reserved.

//! Pool configuration.

use std::env::var_os;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Environment variable overriding the pool's concurrency bound.
pub const POOL_BOUND_ENV: &str = "CRYPTO_CTX_POOL_BOUND";

/// Source of the pool's target concurrency bound.
///
/// The bound is advisory and is evaluated afresh on every admission or
/// release decision, so a bound that changes at runtime takes effect on the
/// next decision. It is never less than 1: a pool that could shrink to no
/// contexts would strand callers already waiting for one.
#[derive(Clone, Default)]
pub enum ConcurrencyBound {
    /// Number of processing units available to the process.
    #[default]
    AvailableParallelism,

    /// A fixed bound.
    Fixed(usize),

    /// A caller-supplied live estimate.
    Dynamic(Arc<dyn Fn() -> usize + Send + Sync>),
}

impl ConcurrencyBound {
    /// Current value of the bound, at least 1.
    pub fn current(&self) -> usize {
        match self {
            ConcurrencyBound::AvailableParallelism => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            ConcurrencyBound::Fixed(bound) => (*bound).max(1),
            ConcurrencyBound::Dynamic(bound) => bound().max(1),
        }
    }
}

impl std::fmt::Debug for ConcurrencyBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyBound::AvailableParallelism => f.write_str("AvailableParallelism"),
            ConcurrencyBound::Fixed(bound) => f.debug_tuple("Fixed").field(bound).finish(),
            ConcurrencyBound::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

/// Context pool configuration.
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Target concurrency bound for context growth.
    pub bound: ConcurrencyBound,
}

impl PoolConfig {
    /// Configuration with the default bound (available parallelism).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the concurrency bound.
    pub fn with_bound(mut self, bound: ConcurrencyBound) -> Self {
        self.bound = bound;
        self
    }

    /// Default configuration, with the bound overridden by
    /// [`POOL_BOUND_ENV`] when it holds a positive integer.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let config = Self::default();
        let Some(value) = var_os(POOL_BOUND_ENV) else {
            return config;
        };

        match value.to_str().map(str::parse::<NonZeroUsize>) {
            Some(Ok(bound)) => {
                tracing::debug!(bound = bound.get(), "Pool bound from environment");
                config.with_bound(ConcurrencyBound::Fixed(bound.get()))
            }
            _ => {
                tracing::warn!(?value, var = POOL_BOUND_ENV, "Ignoring invalid pool bound");
                config
            }
        }
    }
}
