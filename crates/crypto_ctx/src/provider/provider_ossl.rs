// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL-backed cryptographic provider.
//!
//! Transforms are resolved by name through OpenSSL's digest and cipher
//! tables. Construction primes an OpenSSL context for the algorithm so that
//! an algorithm the library refuses at runtime (for example MD4 or DES when
//! the legacy provider is not loaded) is reported as unavailable up front
//! rather than on first use.

use openssl::cipher::Cipher;
use openssl::cipher::CipherRef;
use openssl::cipher_ctx::CipherCtx;
use openssl::cipher_ctx::CipherCtxRef;
use openssl::error::ErrorStack;
use openssl::hash::Hasher;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;

use super::*;

/// CMAC key size used when checking CMAC availability.
const CMAC_CHECK_KEY_SIZE: usize = 16;

fn unavailable(name: &str) -> impl FnOnce(ErrorStack) -> CryptoCtxError + '_ {
    move |openssl_error_stack| {
        tracing::warn!(name, ?openssl_error_stack, "OpenSSL refused transform");
        CryptoCtxError::EngineUnavailable
    }
}

fn operation_error(openssl_error_stack: ErrorStack) -> CryptoCtxError {
    tracing::error!(?openssl_error_stack);
    CryptoCtxError::OperationError
}

/// OpenSSL cryptographic provider.
///
/// Stateless: every call resolves the transform name against OpenSSL's
/// tables, so one instance can serve any number of pools and threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsslProvider;

impl OsslProvider {
    /// Creates the OpenSSL provider.
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for OsslProvider {
    type HashTfm = OsslHashTfm;
    type AeadTfm = OsslAeadTfm;
    type BlkCipherTfm = OsslBlkCipherTfm;

    fn alloc_hash(&self, name: &'static str) -> Result<Self::HashTfm, CryptoCtxError> {
        OsslHashTfm::new(name)
    }

    /// Reports one input block plus one output block, enough to stage a
    /// partial block and the finished digest or MAC.
    fn hash_desc_size(&self, tfm: &Self::HashTfm) -> usize {
        match &tfm.kind {
            OsslHashKind::Digest { md, .. } | OsslHashKind::Hmac { md } => {
                md.block_size() + md.size()
            }
            OsslHashKind::Cmac { cipher } => 2 * cipher.block_size(),
        }
    }

    fn alloc_aead(&self, name: &'static str) -> Result<Self::AeadTfm, CryptoCtxError> {
        let cipher = match parse_transform_name(name) {
            (Some("gcm"), "aes") => Cipher::aes_128_gcm(),
            (Some("ccm"), "aes") => Cipher::aes_128_ccm(),
            _ => {
                tracing::warn!(name, "Unknown AEAD transform");
                Err(CryptoCtxError::EngineUnavailable)?
            }
        };

        Ok(OsslAeadTfm {
            cipher,
            ctx: init_cipher_ctx(name, cipher)?,
        })
    }

    fn alloc_blkcipher(&self, name: &'static str) -> Result<Self::BlkCipherTfm, CryptoCtxError> {
        let cipher = match parse_transform_name(name) {
            (Some("ecb"), "des") => Cipher::des_ecb(),
            _ => {
                tracing::warn!(name, "Unknown block cipher transform");
                Err(CryptoCtxError::EngineUnavailable)?
            }
        };

        Ok(OsslBlkCipherTfm {
            cipher,
            ctx: init_cipher_ctx(name, cipher)?,
        })
    }
}

fn init_cipher_ctx(name: &str, cipher: &CipherRef) -> Result<CipherCtx, CryptoCtxError> {
    let mut ctx = CipherCtx::new().map_err(unavailable(name))?;
    ctx.encrypt_init(Some(cipher), None, None)
        .map_err(unavailable(name))?;
    Ok(ctx)
}

enum OsslHashKind {
    Digest { md: MessageDigest, hasher: Hasher },
    Hmac { md: MessageDigest },
    Cmac { cipher: openssl::symm::Cipher },
}

/// OpenSSL keyed-hash / digest engine handle.
///
/// Wraps one of: a plain digest with a reusable OpenSSL `Hasher`, an HMAC
/// over a digest, or a CMAC over AES-128.
pub struct OsslHashTfm {
    name: &'static str,
    kind: OsslHashKind,
}

impl OsslHashTfm {
    fn new(name: &'static str) -> Result<Self, CryptoCtxError> {
        let kind = match parse_transform_name(name) {
            (None, digest) => {
                let md = lookup_digest(name, digest)?;
                let hasher = Hasher::new(md).map_err(unavailable(name))?;
                OsslHashKind::Digest { md, hasher }
            }
            (Some("hmac"), digest) => {
                let md = lookup_digest(name, digest)?;
                // Hmac keys are bound per use; check the digest now.
                Hasher::new(md).map_err(unavailable(name))?;
                OsslHashKind::Hmac { md }
            }
            (Some("cmac"), "aes") => {
                let cipher = openssl::symm::Cipher::aes_128_cbc();
                PKey::cmac(&cipher, &[0u8; CMAC_CHECK_KEY_SIZE]).map_err(unavailable(name))?;
                OsslHashKind::Cmac { cipher }
            }
            _ => {
                tracing::warn!(name, "Unknown hash transform");
                Err(CryptoCtxError::EngineUnavailable)?
            }
        };

        Ok(Self { name, kind })
    }

    /// Transform name this handle was built for.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Size in bytes of the digest or MAC this handle produces.
    pub fn output_size(&self) -> usize {
        match &self.kind {
            OsslHashKind::Digest { md, .. } | OsslHashKind::Hmac { md } => md.size(),
            OsslHashKind::Cmac { cipher } => cipher.block_size(),
        }
    }

    /// Whether this handle computes a keyed MAC rather than a plain digest.
    pub fn is_keyed(&self) -> bool {
        !matches!(self.kind, OsslHashKind::Digest { .. })
    }

    /// Computes a digest of `data`.
    ///
    /// The handle's `Hasher` is reused across calls.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::OperationError` - The handle is keyed, or OpenSSL failed.
    pub fn digest(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoCtxError> {
        let OsslHashKind::Digest { hasher, .. } = &mut self.kind else {
            tracing::error!(name = self.name, "digest requested from keyed transform");
            return Err(CryptoCtxError::OperationError);
        };

        hasher.update(data).map_err(operation_error)?;
        let digest = hasher.finish().map_err(operation_error)?;
        Ok(digest.to_vec())
    }

    /// Computes a MAC of `data` under `key` into `output`.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::BufferTooSmall` - `output` is shorter than [`Self::output_size`].
    /// * `CryptoCtxError::OperationError` - The handle is a plain digest, or OpenSSL failed.
    pub fn mac(&self, key: &[u8], data: &[u8], output: &mut [u8]) -> Result<usize, CryptoCtxError> {
        if output.len() < self.output_size() {
            Err(CryptoCtxError::BufferTooSmall)?;
        }

        let (pkey, md) = match &self.kind {
            OsslHashKind::Hmac { md } => (PKey::hmac(key), Some(*md)),
            OsslHashKind::Cmac { cipher } => (PKey::cmac(cipher, key), None),
            OsslHashKind::Digest { .. } => {
                tracing::error!(name = self.name, "mac requested from unkeyed transform");
                return Err(CryptoCtxError::OperationError);
            }
        };
        let pkey = pkey.map_err(operation_error)?;

        let mut signer = match md {
            Some(md) => Signer::new(md, &pkey),
            None => Signer::new_without_digest(&pkey),
        }
        .map_err(operation_error)?;

        signer.update(data).map_err(operation_error)?;
        signer.sign(output).map_err(operation_error)
    }
}

fn lookup_digest(name: &str, digest: &str) -> Result<MessageDigest, CryptoCtxError> {
    MessageDigest::from_name(digest).ok_or_else(|| {
        tracing::warn!(name, digest, "OpenSSL has no such digest");
        CryptoCtxError::EngineUnavailable
    })
}

/// OpenSSL authenticated-encryption engine handle.
///
/// Holds a cipher context initialised for the algorithm; callers supply key
/// and nonce per use through [`Self::ctx_mut`].
pub struct OsslAeadTfm {
    cipher: &'static CipherRef,
    ctx: CipherCtx,
}

impl OsslAeadTfm {
    /// The OpenSSL cipher this handle is bound to.
    pub fn cipher(&self) -> &'static CipherRef {
        self.cipher
    }

    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        self.cipher.key_length()
    }

    /// Default nonce length in bytes.
    pub fn iv_length(&self) -> usize {
        self.cipher.iv_length()
    }

    /// The initialised OpenSSL cipher context.
    pub fn ctx_mut(&mut self) -> &mut CipherCtxRef {
        &mut self.ctx
    }
}

/// OpenSSL legacy block-cipher engine handle.
pub struct OsslBlkCipherTfm {
    cipher: &'static CipherRef,
    ctx: CipherCtx,
}

impl OsslBlkCipherTfm {
    /// The OpenSSL cipher this handle is bound to.
    pub fn cipher(&self) -> &'static CipherRef {
        self.cipher
    }

    /// Cipher block size in bytes.
    pub fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    /// The initialised OpenSSL cipher context.
    pub fn ctx_mut(&mut self) -> &mut CipherCtxRef {
        &mut self.ctx
    }
}
