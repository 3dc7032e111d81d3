// Copyright (C) Microsoft Corporation. All rights reserved.

//! Crypto context: a reusable container of lazily built engine handles.
//!
//! A context carries one slot table per algorithm family, indexed by the
//! family's identifier. A slot is either empty or holds a complete handle for
//! exactly that identifier; a failed construction leaves it empty. Slots fill
//! in over the context's lifetime as different algorithms are requested
//! against it and are all released together when the context is dropped.
//!
//! A context is owned by one caller at a time, so slot access needs no
//! locking.

use crate::AeadAlgoId;
use crate::AlgoId;
use crate::BlkCipherAlgoId;
use crate::CryptoCtxError;
use crate::CryptoProvider;
use crate::EngineFactory;
use crate::HashAlgoId;
use crate::HashDesc;
use strum::EnumCount;

type Slots<T> = Box<[Option<T>]>;

fn alloc_slots<T>(count: usize) -> Result<Slots<T>, CryptoCtxError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(count).map_err(|error| {
        tracing::error!(count, %error, "Crypto context slot allocation failed");
        CryptoCtxError::OutOfMemory
    })?;
    slots.resize_with(count, || None);
    Ok(slots.into_boxed_slice())
}

#[cfg(test)]
thread_local! {
    static FAILING_ALLOCS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Makes the next `count` context allocations on this thread fail.
#[cfg(test)]
pub(crate) fn fail_next_allocs(count: usize) {
    FAILING_ALLOCS.with(|failing| failing.set(count));
}

#[cfg(test)]
fn take_failing_alloc() -> bool {
    FAILING_ALLOCS.with(|failing| {
        let count = failing.get();
        failing.set(count.saturating_sub(1));
        count > 0
    })
}

fn populated<T>(slots: &[Option<T>]) -> usize {
    slots.iter().filter(|slot| slot.is_some()).count()
}

/// Reusable cryptographic working state.
///
/// Contexts are interchangeable; `id` only exists for diagnostics.
pub struct CryptoCtx<P: CryptoProvider> {
    id: u64,
    hash: Slots<HashDesc<P::HashTfm>>,
    aead: Slots<P::AeadTfm>,
    #[cfg(feature = "legacy-blkcipher")]
    blkcipher: Slots<P::BlkCipherTfm>,
}

impl<P: CryptoProvider> CryptoCtx<P> {
    /// Creates an empty context.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::OutOfMemory` - The slot tables could not be allocated.
    pub(crate) fn try_new(id: u64) -> Result<Self, CryptoCtxError> {
        #[cfg(test)]
        if take_failing_alloc() {
            tracing::error!(id, "Crypto context allocation failed");
            Err(CryptoCtxError::OutOfMemory)?;
        }

        Ok(Self {
            id,
            hash: alloc_slots(HashAlgoId::COUNT)?,
            aead: alloc_slots(AeadAlgoId::COUNT)?,
            #[cfg(feature = "legacy-blkcipher")]
            blkcipher: alloc_slots(BlkCipherAlgoId::COUNT)?,
        })
    }

    /// Diagnostic identifier assigned by the pool.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Makes sure the handle for `algo` is cached in this context.
    ///
    /// Builds the handle through the [`EngineFactory`] on first use and
    /// reuses it afterwards.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::UnsupportedAlgorithm` - The family is not built in.
    /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built;
    ///   the slot stays empty and the context remains usable.
    pub fn ensure(&mut self, provider: &P, algo: AlgoId) -> Result<(), CryptoCtxError> {
        match algo {
            AlgoId::Hash(id) => self.ensure_hash(provider, id).map(|_| ()),
            AlgoId::Aead(id) => self.ensure_aead(provider, id).map(|_| ()),
            AlgoId::BlkCipher(id) => self.ensure_blkcipher(provider, id).map(|_| ()),
        }
    }

    /// Returns the cached keyed-hash handle for `id`, building it if needed.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built.
    pub fn ensure_hash(
        &mut self,
        provider: &P,
        id: HashAlgoId,
    ) -> Result<&mut HashDesc<P::HashTfm>, CryptoCtxError> {
        let slot = &mut self.hash[id as usize];
        if slot.is_none() {
            tracing::debug!(ctx = self.id, ?id, "Populating hash slot");
            *slot = Some(EngineFactory::hash_desc(provider, id)?);
        }
        slot.as_mut().ok_or(CryptoCtxError::EngineUnavailable)
    }

    /// Returns the cached AEAD handle for `id`, building it if needed.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built.
    pub fn ensure_aead(
        &mut self,
        provider: &P,
        id: AeadAlgoId,
    ) -> Result<&mut P::AeadTfm, CryptoCtxError> {
        let slot = &mut self.aead[id as usize];
        if slot.is_none() {
            tracing::debug!(ctx = self.id, ?id, "Populating aead slot");
            *slot = Some(EngineFactory::aead(provider, id)?);
        }
        slot.as_mut().ok_or(CryptoCtxError::EngineUnavailable)
    }

    /// Cached keyed-hash handle for `id`, if any.
    pub fn hash(&self, id: HashAlgoId) -> Option<&HashDesc<P::HashTfm>> {
        self.hash[id as usize].as_ref()
    }

    /// Cached keyed-hash handle for `id`, mutably, if any.
    pub fn hash_mut(&mut self, id: HashAlgoId) -> Option<&mut HashDesc<P::HashTfm>> {
        self.hash[id as usize].as_mut()
    }

    /// Cached AEAD handle for `id`, if any.
    pub fn aead(&self, id: AeadAlgoId) -> Option<&P::AeadTfm> {
        self.aead[id as usize].as_ref()
    }

    /// Cached AEAD handle for `id`, mutably, if any.
    pub fn aead_mut(&mut self, id: AeadAlgoId) -> Option<&mut P::AeadTfm> {
        self.aead[id as usize].as_mut()
    }

    /// Whether a handle for `algo` is cached.
    pub fn is_populated(&self, algo: AlgoId) -> bool {
        match algo {
            AlgoId::Hash(id) => self.hash(id).is_some(),
            AlgoId::Aead(id) => self.aead(id).is_some(),
            AlgoId::BlkCipher(id) => self.blkcipher(id).is_some(),
        }
    }

    /// Number of cached handles across all families.
    pub fn populated_count(&self) -> usize {
        let count = populated(&self.hash) + populated(&self.aead);
        #[cfg(feature = "legacy-blkcipher")]
        let count = count + populated(&self.blkcipher);
        count
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "legacy-blkcipher")] {
        impl<P: CryptoProvider> CryptoCtx<P> {
            /// Returns the cached block-cipher handle for `id`, building it if needed.
            ///
            /// # Errors
            ///
            /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built.
            pub fn ensure_blkcipher(
                &mut self,
                provider: &P,
                id: BlkCipherAlgoId,
            ) -> Result<&mut P::BlkCipherTfm, CryptoCtxError> {
                let slot = &mut self.blkcipher[id as usize];
                if slot.is_none() {
                    tracing::debug!(ctx = self.id, ?id, "Populating blkcipher slot");
                    *slot = Some(EngineFactory::blkcipher(provider, id)?);
                }
                slot.as_mut().ok_or(CryptoCtxError::EngineUnavailable)
            }

            /// Cached block-cipher handle for `id`, if any.
            pub fn blkcipher(&self, id: BlkCipherAlgoId) -> Option<&P::BlkCipherTfm> {
                self.blkcipher[id as usize].as_ref()
            }

            /// Cached block-cipher handle for `id`, mutably, if any.
            pub fn blkcipher_mut(&mut self, id: BlkCipherAlgoId) -> Option<&mut P::BlkCipherTfm> {
                self.blkcipher[id as usize].as_mut()
            }
        }
    } else {
        impl<P: CryptoProvider> CryptoCtx<P> {
            /// Block ciphers are not built in; always fails.
            ///
            /// # Errors
            ///
            /// * `CryptoCtxError::UnsupportedAlgorithm` - Always.
            pub fn ensure_blkcipher(
                &mut self,
                _provider: &P,
                id: BlkCipherAlgoId,
            ) -> Result<&mut P::BlkCipherTfm, CryptoCtxError> {
                tracing::debug!(ctx = self.id, ?id, "Legacy block ciphers are not built in");
                Err(CryptoCtxError::UnsupportedAlgorithm)
            }

            /// Always `None`: block ciphers are not built in.
            pub fn blkcipher(&self, _id: BlkCipherAlgoId) -> Option<&P::BlkCipherTfm> {
                None
            }

            /// Always `None`: block ciphers are not built in.
            pub fn blkcipher_mut(&mut self, _id: BlkCipherAlgoId) -> Option<&mut P::BlkCipherTfm> {
                None
            }
        }
    }
}

impl<P: CryptoProvider> Drop for CryptoCtx<P> {
    fn drop(&mut self) {
        tracing::trace!(
            ctx = self.id,
            handles = self.populated_count(),
            "Destroying crypto context"
        );
    }
}

impl<P: CryptoProvider> std::fmt::Debug for CryptoCtx<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoCtx")
            .field("id", &self.id)
            .field("populated", &self.populated_count())
            .finish_non_exhaustive()
    }
}
