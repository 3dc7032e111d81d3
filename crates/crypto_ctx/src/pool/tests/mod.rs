// Copyright (C) Microsoft Corporation. All rights reserved.

mod acquire_tests;

use std::sync::Arc;

use super::*;
use crate::provider::mock::MockProvider;

/// Builds a pool over a shared mock provider with a fixed bound.
pub(crate) fn mock_pool(bound: usize) -> (Arc<MockProvider>, CtxPool<Arc<MockProvider>>) {
    let provider = Arc::new(MockProvider::new());
    let pool = CtxPool::new(
        provider.clone(),
        PoolConfig::new().with_bound(ConcurrencyBound::Fixed(bound)),
    )
    .expect("pool init");
    (provider, pool)
}

/// Live contexts according to the pool's own accounting.
pub(crate) fn live(stats: &PoolStats) -> u64 {
    stats.created - stats.destroyed
}
