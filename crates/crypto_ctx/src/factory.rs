// Copyright (C) Microsoft Corporation. All rights reserved.

//! Engine handle construction.
//!
//! Maps an algorithm identifier to a freshly constructed provider handle.
//! Construction is all or nothing as seen by the caller: either a complete
//! handle (with its scratch buffer, for the hash family) comes back, or
//! nothing does and everything built along the way has been released.

use crate::AeadAlgoId;
use crate::BlkCipherAlgoId;
use crate::CryptoCtxError;
use crate::CryptoProvider;
use crate::HashAlgoId;

/// Keyed-hash engine handle together with its per-use scratch buffer.
pub struct HashDesc<T> {
    tfm: T,
    scratch: Box<[u8]>,
}

impl<T> HashDesc<T> {
    /// The engine handle.
    pub fn tfm(&self) -> &T {
        &self.tfm
    }

    /// The engine handle, mutably.
    pub fn tfm_mut(&mut self) -> &mut T {
        &mut self.tfm
    }

    /// The scratch buffer sized to the provider's requirement.
    pub fn scratch_mut(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// Handle and scratch buffer borrowed together.
    pub fn parts_mut(&mut self) -> (&mut T, &mut [u8]) {
        (&mut self.tfm, &mut self.scratch)
    }
}

/// Engine handle factory.
///
/// Stateless apart from the identifier to transform-name tables (see
/// [`HashAlgoId::transform_name`]). Every failure, whatever its cause, is
/// reported as `CryptoCtxError::EngineUnavailable`.
pub struct EngineFactory;

impl EngineFactory {
    /// Builds a keyed-hash handle and its scratch buffer.
    ///
    /// # Arguments
    ///
    /// * `provider` - The cryptographic provider
    /// * `id` - The keyed-hash algorithm
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The provider refused the
    ///   transform or the scratch buffer could not be allocated. In the latter
    ///   case the handle has already been released.
    pub fn hash_desc<P: CryptoProvider>(
        provider: &P,
        id: HashAlgoId,
    ) -> Result<HashDesc<P::HashTfm>, CryptoCtxError> {
        let name = id.transform_name();
        let tfm = provider
            .alloc_hash(name)
            .map_err(|error| Self::unavailable(name, error))?;

        let size = provider.hash_desc_size(&tfm);
        let mut scratch = Vec::new();
        if let Err(error) = scratch.try_reserve_exact(size) {
            tracing::warn!(name, size, %error, "Scratch buffer allocation failed");
            // Dropping `tfm` here releases the handle.
            Err(CryptoCtxError::EngineUnavailable)?;
        }
        scratch.resize(size, 0u8);

        Ok(HashDesc {
            tfm,
            scratch: scratch.into_boxed_slice(),
        })
    }

    /// Builds an authenticated-encryption handle.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The provider refused the transform.
    pub fn aead<P: CryptoProvider>(
        provider: &P,
        id: AeadAlgoId,
    ) -> Result<P::AeadTfm, CryptoCtxError> {
        let name = id.transform_name();
        provider
            .alloc_aead(name)
            .map_err(|error| Self::unavailable(name, error))
    }

    /// Builds a legacy block-cipher handle.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The provider refused the transform.
    pub fn blkcipher<P: CryptoProvider>(
        provider: &P,
        id: BlkCipherAlgoId,
    ) -> Result<P::BlkCipherTfm, CryptoCtxError> {
        let name = id.transform_name();
        provider
            .alloc_blkcipher(name)
            .map_err(|error| Self::unavailable(name, error))
    }

    fn unavailable(name: &'static str, error: CryptoCtxError) -> CryptoCtxError {
        tracing::warn!(name, %error, "Engine handle unavailable");
        CryptoCtxError::EngineUnavailable
    }
}
