// Copyright (C) Microsoft Corporation. All rights reserved.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use test_with_tracing::test;

use super::*;
use crate::AeadAlgoId;
use crate::AlgoFamily;
use crate::AlgoId;
use crate::BlkCipherAlgoId;
use crate::HashAlgoId;

#[test]
fn test_new_pool_has_one_seed_context() {
    let (_, pool) = mock_pool(4);
    let stats = pool.stats();
    assert_eq!(stats.idle, 1);
    assert_eq!(stats.allocated, 1);
    assert_eq!(stats.checked_out, 0);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.destroyed, 0);
    assert_eq!(stats.bound, 4);
}

#[test]
fn test_acquire_serves_idle_context_first() {
    let (_, pool) = mock_pool(4);
    let ctx = pool.acquire();
    assert_eq!(ctx.id(), 0);

    let stats = pool.stats();
    assert_eq!(stats.idle, 0);
    assert_eq!(stats.allocated, 1);
    assert_eq!(stats.checked_out, 1);
    assert_eq!(stats.created, 1);
}

#[test]
fn test_acquire_grows_while_within_bound() {
    let (_, pool) = mock_pool(4);

    // Seed plus growth while the counter has not passed the bound.
    let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();

    let stats = pool.stats();
    assert_eq!(stats.allocated, 5);
    assert_eq!(stats.created, 5);
    assert_eq!(stats.checked_out, 5);

    let mut ids: Vec<u64> = held.iter().map(|ctx| ctx.id()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[test]
fn test_acquire_blocks_once_counter_exceeds_bound() {
    let (_, pool) = mock_pool(4);
    let pool = &pool;

    thread::scope(|s| {
        // Four concurrent requesters: one takes the seed, three grow the pool.
        let workers: Vec<_> = (0..4)
            .map(|_| s.spawn(|| pool.acquire_sha512().expect("acquire sha512")))
            .collect();
        let mut held: Vec<_> = workers
            .into_iter()
            .map(|worker| worker.join().expect("worker"))
            .collect();

        let stats = pool.stats();
        assert_eq!(stats.allocated, 4);
        assert_eq!(stats.created, 4);
        assert_eq!(stats.idle, 0);

        // The counter equals the bound, so one more context may be built.
        held.push(pool.acquire_sha512().expect("acquire sha512"));
        assert_eq!(pool.stats().allocated, 5);

        // Now the counter is past the bound: the next acquire blocks.
        let (tx, rx) = mpsc::channel();
        s.spawn(move || {
            let ctx = pool.acquire_sha512().expect("acquire sha512");
            tx.send(ctx.id()).expect("send");
        });
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        // The first release shrinks the pool back to the bound instead of
        // pooling, so the waiter stays blocked.
        drop(held.pop());
        assert_eq!(pool.stats().destroyed, 1);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        // The second release pools its context and wakes the waiter.
        let released = held.pop().map(|ctx| ctx.id());
        let woken = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("waiter woken");
        assert_eq!(Some(woken), released);

        drop(held);
    });

    let stats = pool.stats();
    assert_eq!(stats.checked_out, 0);
    assert_eq!(stats.allocated, 4);
    assert_eq!(stats.idle, 4);
    assert_eq!(stats.created, 5);
}

#[test]
fn test_growth_failure_waits_for_release() {
    let (_, pool) = mock_pool(4);
    let pool = &pool;
    let seed = pool.acquire();

    thread::scope(|s| {
        let (tx, rx) = mpsc::channel();
        s.spawn(move || {
            crate::ctx::fail_next_allocs(1);
            let ctx = pool.acquire();
            tx.send(ctx.id()).expect("send");
        });

        // The failed growth gave its reservation back and the caller waits
        // even though the counter is within the bound.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        let stats = pool.stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.created, 1);

        drop(seed);
        let woken = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("waiter woken");
        assert_eq!(woken, 0);
    });

    let stats = pool.stats();
    assert_eq!(stats.allocated, 1);
    assert_eq!(stats.idle, 1);
    assert_eq!(stats.created, 1);
}

#[test]
fn test_acquire_for_caches_handles_across_reacquire() {
    let (provider, pool) = mock_pool(1);

    let mut ctx = pool.acquire_sha512().expect("acquire sha512");
    ctx.ensure(AeadAlgoId::Aes128Gcm.into())
        .expect("ensure gcm(aes)");
    let id = ctx.id();
    let sha_serial = ctx.hash(HashAlgoId::Sha512).map(|d| d.tfm().serial);
    let gcm_serial = ctx.aead(AeadAlgoId::Aes128Gcm).map(|t| t.serial);
    assert_ne!(sha_serial, gcm_serial);
    assert_eq!(provider.constructed(), 2);
    pool.release(Some(ctx));

    let ctx = pool.acquire_sha512().expect("reacquire sha512");
    assert_eq!(ctx.id(), id);
    assert_eq!(ctx.hash(HashAlgoId::Sha512).map(|d| d.tfm().serial), sha_serial);
    assert_eq!(ctx.aead(AeadAlgoId::Aes128Gcm).map(|t| t.serial), gcm_serial);
    assert_eq!(provider.constructed(), 2);
}

#[test]
fn test_acquire_for_unavailable_returns_context_to_pool() {
    let (provider, pool) = mock_pool(4);
    provider.refuse("md4");

    assert!(matches!(
        pool.acquire_md4(),
        Err(CryptoCtxError::EngineUnavailable)
    ));
    let stats = pool.stats();
    assert_eq!(stats.checked_out, 0);
    assert_eq!(stats.idle, 1);

    // Same context, different identifier.
    let ctx = pool.acquire_md5().expect("acquire md5");
    assert_eq!(ctx.id(), 0);
    assert!(ctx.is_populated(HashAlgoId::Md5.into()));
    assert!(!ctx.is_populated(HashAlgoId::Md4.into()));
}

#[test]
fn test_ensure_after_unavailable_on_held_context() {
    let (provider, pool) = mock_pool(4);
    provider.refuse("ccm(aes)");

    let mut ctx = pool.acquire();
    assert_eq!(
        ctx.ensure(AeadAlgoId::Aes128Ccm.into()),
        Err(CryptoCtxError::EngineUnavailable)
    );
    ctx.ensure(AeadAlgoId::Aes128Gcm.into())
        .expect("ensure gcm(aes)");
    assert_eq!(ctx.populated_count(), 1);
    pool.release(Some(ctx));

    assert_eq!(pool.stats().idle, 1);
}

#[test]
fn test_acquire_for_raw() {
    let (provider, pool) = mock_pool(4);

    let ctx = pool
        .acquire_for_raw(AlgoFamily::Hash, HashAlgoId::CmacAes as u32)
        .expect("acquire cmac(aes)");
    assert!(ctx.is_populated(HashAlgoId::CmacAes.into()));
    drop(ctx);

    assert_eq!(
        pool.acquire_for_raw(AlgoFamily::Aead, 2).map(|ctx| ctx.id()),
        Err(CryptoCtxError::UnsupportedAlgorithm)
    );
    assert_eq!(
        pool.acquire_for_raw(AlgoFamily::Hash, 6).map(|ctx| ctx.id()),
        Err(CryptoCtxError::UnsupportedAlgorithm)
    );
    assert_eq!(provider.constructed(), 1);
}

#[test]
fn test_out_of_range_never_touches_pool() {
    let (_, pool) = mock_pool(1);

    // The counter is past the bound, so any acquire would now block.
    let _held = pool.acquire();
    let _grown = pool.acquire();
    assert_eq!(pool.stats().allocated, 2);

    assert_eq!(
        pool.acquire_for_raw(AlgoFamily::Hash, u32::MAX).map(|ctx| ctx.id()),
        Err(CryptoCtxError::UnsupportedAlgorithm)
    );
}

type AcquireFn =
    fn(&CtxPool<Arc<MockProvider>>) -> Result<PooledCtx<'_, Arc<MockProvider>>, CryptoCtxError>;

#[test]
fn test_named_entry_points() {
    let (provider, pool) = mock_pool(4);

    let cases: [(AcquireFn, AlgoId); 8] = [
        (CtxPool::acquire_hmacmd5, HashAlgoId::HmacMd5.into()),
        (CtxPool::acquire_hmacsha256, HashAlgoId::HmacSha256.into()),
        (CtxPool::acquire_cmacaes, HashAlgoId::CmacAes.into()),
        (CtxPool::acquire_sha512, HashAlgoId::Sha512.into()),
        (CtxPool::acquire_md4, HashAlgoId::Md4.into()),
        (CtxPool::acquire_md5, HashAlgoId::Md5.into()),
        (CtxPool::acquire_gcm, AeadAlgoId::Aes128Gcm.into()),
        (CtxPool::acquire_ccm, AeadAlgoId::Aes128Ccm.into()),
    ];

    for (acquire, algo) in cases {
        let ctx = acquire(&pool).expect("acquire");
        assert!(ctx.is_populated(algo), "{algo:?} not cached");
    }

    // Sequential use keeps reusing the seed context.
    assert_eq!(pool.stats().created, 1);
    assert_eq!(provider.constructed(), 8);
}

#[cfg(not(feature = "legacy-blkcipher"))]
#[test]
fn test_blkcipher_rejected_without_touching_pool() {
    let (provider, pool) = mock_pool(4);

    assert!(matches!(
        pool.acquire_for(BlkCipherAlgoId::EcbDes.into()),
        Err(CryptoCtxError::UnsupportedAlgorithm)
    ));
    let stats = pool.stats();
    assert_eq!(stats.idle, 1);
    assert_eq!(stats.checked_out, 0);
    assert_eq!(provider.constructed(), 0);
}

#[cfg(feature = "legacy-blkcipher")]
#[test]
fn test_acquire_ecbdes() {
    let (provider, pool) = mock_pool(4);

    let ctx = pool.acquire_ecbdes().expect("acquire ecb(des)");
    assert!(ctx.is_populated(BlkCipherAlgoId::EcbDes.into()));
    assert_eq!(provider.constructed(), 1);
}
