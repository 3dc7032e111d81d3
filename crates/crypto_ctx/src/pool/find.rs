// Copyright (C) Microsoft Corporation. All rights reserved.

//! Per-algorithm acquire entry points.
//!
//! Each entry point acquires a context and makes sure the requested engine
//! handle is cached in it. When the handle cannot be built the context goes
//! straight back to the pool and the error is returned, so callers never hold
//! a context on the failure path.

use super::*;
use crate::AeadAlgoId;
use crate::AlgoFamily;
use crate::AlgoId;
use crate::HashAlgoId;

impl<P: CryptoProvider> CtxPool<P> {
    /// Acquires a context with the handle for `algo` cached.
    ///
    /// Blocks like [`CtxPool::acquire`].
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::UnsupportedAlgorithm` - The family is not built in;
    ///   rejected before touching the pool.
    /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built;
    ///   the context has been returned to the pool.
    pub fn acquire_for(&self, algo: AlgoId) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        if !algo.family().is_enabled() {
            tracing::debug!(?algo, "Algorithm family is not built in");
            Err(CryptoCtxError::UnsupportedAlgorithm)?;
        }

        let mut ctx = self.acquire();
        ctx.ensure(algo)?;
        Ok(ctx)
    }

    /// Acquires a context for a raw identifier within `family`.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::UnsupportedAlgorithm` - `raw` is outside the family;
    ///   the pool is not touched.
    /// * `CryptoCtxError::EngineUnavailable` - The handle could not be built.
    pub fn acquire_for_raw(
        &self,
        family: AlgoFamily,
        raw: u32,
    ) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(AlgoId::from_raw(family, raw)?)
    }

    /// Acquires a context with an HMAC-MD5 handle.
    pub fn acquire_hmacmd5(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(HashAlgoId::HmacMd5.into())
    }

    /// Acquires a context with an HMAC-SHA256 handle.
    pub fn acquire_hmacsha256(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(HashAlgoId::HmacSha256.into())
    }

    /// Acquires a context with an AES-CMAC handle.
    pub fn acquire_cmacaes(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(HashAlgoId::CmacAes.into())
    }

    /// Acquires a context with a SHA-512 handle.
    pub fn acquire_sha512(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(HashAlgoId::Sha512.into())
    }

    /// Acquires a context with an MD4 handle.
    pub fn acquire_md4(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(HashAlgoId::Md4.into())
    }

    /// Acquires a context with an MD5 handle.
    pub fn acquire_md5(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(HashAlgoId::Md5.into())
    }

    /// Acquires a context with an AES-128-GCM handle.
    pub fn acquire_gcm(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(AeadAlgoId::Aes128Gcm.into())
    }

    /// Acquires a context with an AES-128-CCM handle.
    pub fn acquire_ccm(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(AeadAlgoId::Aes128Ccm.into())
    }

    /// Acquires a context with a DES-ECB handle.
    #[cfg(feature = "legacy-blkcipher")]
    pub fn acquire_ecbdes(&self) -> Result<PooledCtx<'_, P>, CryptoCtxError> {
        self.acquire_for(crate::BlkCipherAlgoId::EcbDes.into())
    }
}
