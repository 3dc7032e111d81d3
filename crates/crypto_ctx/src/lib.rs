// Copyright (C) Microsoft Corporation. All rights reserved.

//! Pool of reusable cryptographic engine contexts.
//!
//! Building an engine handle (a keyed hash, an AEAD transform, a legacy block
//! cipher) from the cryptographic provider is expensive compared to the short
//! request handlers that use it. This crate keeps a bounded set of
//! [`CryptoCtx`] containers alive and hands them out to worker threads; each
//! context lazily caches at most one engine handle per algorithm, so a context
//! that has served a SHA-512 request before will serve the next one without
//! touching the provider again.
//!
//! - **Algorithms**: closed identifier families ([`HashAlgoId`], [`AeadAlgoId`],
//!   [`BlkCipherAlgoId`]) mapped to provider transform names
//! - **Provider**: the [`CryptoProvider`] seam and its OpenSSL implementation
//!   [`OsslProvider`]
//! - **Factory**: [`EngineFactory`], all-or-nothing handle construction
//! - **Context**: [`CryptoCtx`], per-family slot tables
//! - **Pool**: [`CtxPool`], admission control, blocking acquire and
//!   return-or-destroy release
//!
//! # Usage
//!
//! A server builds one pool at startup and shares it with its workers:
//!
//! ```no_run
//! use crypto_ctx::*;
//!
//! let pool = CtxPool::new(OsslProvider::new(), PoolConfig::from_env())?;
//! let mut ctx = pool.acquire_sha512()?;
//! let _digest = ctx
//!     .hash_mut(HashAlgoId::Sha512)
//!     .ok_or(CryptoCtxError::EngineUnavailable)?
//!     .tfm_mut()
//!     .digest(b"payload")?;
//! pool.release(Some(ctx));
//! pool.shutdown();
//! # Ok::<(), CryptoCtxError>(())
//! ```
//!
//! # Legacy targets
//!
//! The DES-ECB block-cipher family is compiled into contexts only with the
//! `legacy-blkcipher` feature.

mod algo;
mod config;
mod ctx;
mod factory;
mod pool;
mod provider;

pub use algo::*;
pub use config::*;
pub use ctx::*;
pub use factory::*;
pub use pool::*;
pub use provider::*;
use thiserror::Error;

/// Error type for context pool and engine handle operations.
///
/// Provider failures never cross the provider boundary as anything but one of
/// these variants; the original cause is logged where it happens.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CryptoCtxError {
    /// Algorithm identifier is outside its family or its family is not built in.
    #[error("unsupported algorithm identifier")]
    UnsupportedAlgorithm,
    /// The provider could not construct the engine handle, or its scratch
    /// buffer could not be allocated.
    #[error("crypto engine unavailable")]
    EngineUnavailable,
    /// Allocation of a crypto context failed.
    #[error("crypto context allocation failed")]
    OutOfMemory,
    /// An operation on a constructed engine handle failed.
    #[error("crypto operation failed")]
    OperationError,
    /// Output buffer is too small for the operation.
    #[error("output buffer too small")]
    BufferTooSmall,
}
