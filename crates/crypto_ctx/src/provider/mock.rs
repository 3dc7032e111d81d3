// Copyright (C) Microsoft Corporation. All rights reserved.

//! Counting provider for unit tests.

use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use super::*;

/// Engine handle handed out by [`MockProvider`].
///
/// Every handle gets a distinct serial so tests can tell a cached handle from
/// a rebuilt one. Dropping a handle is counted as a release.
#[derive(Debug)]
pub(crate) struct MockTfm {
    pub(crate) serial: usize,
    pub(crate) name: &'static str,
    released: Arc<AtomicUsize>,
}

impl Drop for MockTfm {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Provider that fabricates handles and counts constructions and releases.
#[derive(Default)]
pub(crate) struct MockProvider {
    constructed: AtomicUsize,
    released: Arc<AtomicUsize>,
    unavailable: Mutex<HashSet<&'static str>>,
    desc_size: Option<usize>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reports `size` as every hash transform's scratch requirement.
    pub(crate) fn with_desc_size(mut self, size: usize) -> Self {
        self.desc_size = Some(size);
        self
    }

    /// Makes the provider refuse `name` from now on.
    pub(crate) fn refuse(&self, name: &'static str) {
        self.unavailable.lock().insert(name);
    }

    /// Number of handles constructed so far.
    pub(crate) fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Number of handles released so far.
    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn alloc(&self, name: &'static str) -> Result<MockTfm, CryptoCtxError> {
        if self.unavailable.lock().contains(name) {
            Err(CryptoCtxError::EngineUnavailable)?;
        }

        let serial = self.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(MockTfm {
            serial,
            name,
            released: self.released.clone(),
        })
    }
}

impl CryptoProvider for MockProvider {
    type HashTfm = MockTfm;
    type AeadTfm = MockTfm;
    type BlkCipherTfm = MockTfm;

    fn alloc_hash(&self, name: &'static str) -> Result<Self::HashTfm, CryptoCtxError> {
        self.alloc(name)
    }

    fn hash_desc_size(&self, _tfm: &Self::HashTfm) -> usize {
        self.desc_size.unwrap_or(64)
    }

    fn alloc_aead(&self, name: &'static str) -> Result<Self::AeadTfm, CryptoCtxError> {
        self.alloc(name)
    }

    fn alloc_blkcipher(&self, name: &'static str) -> Result<Self::BlkCipherTfm, CryptoCtxError> {
        self.alloc(name)
    }
}
