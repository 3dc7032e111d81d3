// Copyright (C) Microsoft Corporation. All rights reserved.

#![allow(clippy::expect_used)]

use crypto_ctx::*;

/// OpenSSL-backed pool with a fixed bound.
pub fn ossl_pool(bound: usize) -> CtxPool<OsslProvider> {
    CtxPool::new(
        OsslProvider::new(),
        PoolConfig::new().with_bound(ConcurrencyBound::Fixed(bound)),
    )
    .expect("Failed to initialize context pool")
}
