// Copyright (C) Microsoft Corporation. All rights reserved.

//! Cryptographic provider seam.
//!
//! The pool never performs cryptography itself. It asks a [`CryptoProvider`]
//! to instantiate named algorithm transforms and to report how much per-use
//! scratch space a keyed-hash transform needs. Transform names use the
//! template syntax `mode(inner)`, e.g. `hmac(sha256)`, `gcm(aes)`.
//!
//! Dropping an engine handle releases it back to the provider.

use std::sync::Arc;

use crate::CryptoCtxError;

mod provider_ossl;

#[cfg(test)]
pub(crate) mod mock;

pub use provider_ossl::*;

/// Source of engine handles.
///
/// Implementations must be usable from many worker threads at once; the
/// handles they return are owned by exactly one context at a time.
pub trait CryptoProvider: Send + Sync {
    /// Keyed-hash / digest engine handle.
    type HashTfm: Send;

    /// Authenticated-encryption engine handle.
    type AeadTfm: Send;

    /// Legacy block-cipher engine handle.
    type BlkCipherTfm: Send;

    /// Instantiates a keyed-hash or digest transform.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The provider cannot supply `name`.
    fn alloc_hash(&self, name: &'static str) -> Result<Self::HashTfm, CryptoCtxError>;

    /// Scratch buffer size, in bytes, required per use of `tfm`.
    fn hash_desc_size(&self, tfm: &Self::HashTfm) -> usize;

    /// Instantiates an authenticated-encryption transform.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The provider cannot supply `name`.
    fn alloc_aead(&self, name: &'static str) -> Result<Self::AeadTfm, CryptoCtxError>;

    /// Instantiates a legacy block-cipher transform.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::EngineUnavailable` - The provider cannot supply `name`.
    fn alloc_blkcipher(&self, name: &'static str) -> Result<Self::BlkCipherTfm, CryptoCtxError>;
}

/// A shared provider, e.g. one provider instance behind several pools.
impl<T: CryptoProvider> CryptoProvider for Arc<T> {
    type HashTfm = T::HashTfm;
    type AeadTfm = T::AeadTfm;
    type BlkCipherTfm = T::BlkCipherTfm;

    fn alloc_hash(&self, name: &'static str) -> Result<Self::HashTfm, CryptoCtxError> {
        (**self).alloc_hash(name)
    }

    fn hash_desc_size(&self, tfm: &Self::HashTfm) -> usize {
        (**self).hash_desc_size(tfm)
    }

    fn alloc_aead(&self, name: &'static str) -> Result<Self::AeadTfm, CryptoCtxError> {
        (**self).alloc_aead(name)
    }

    fn alloc_blkcipher(&self, name: &'static str) -> Result<Self::BlkCipherTfm, CryptoCtxError> {
        (**self).alloc_blkcipher(name)
    }
}

/// Splits a transform name into its template and inner algorithm.
///
/// `hmac(sha256)` yields `(Some("hmac"), "sha256")`, a bare `sha512` yields
/// `(None, "sha512")`.
pub(crate) fn parse_transform_name(name: &str) -> (Option<&str>, &str) {
    name.split_once('(')
        .and_then(|(template, rest)| rest.strip_suffix(')').map(|inner| (Some(template), inner)))
        .unwrap_or((None, name))
}
