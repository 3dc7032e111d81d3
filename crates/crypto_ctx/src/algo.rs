// Copyright (C) Microsoft Corporation. All rights reserved.

//! Algorithm identifier families.
//!
//! Each family is a small closed enumeration numbered from zero so an
//! identifier doubles as the index of its slot in a [`crate::CryptoCtx`].
//! The transform names follow the provider's template syntax, e.g.
//! `hmac(sha256)` is an HMAC built over the `sha256` digest.

use strum::EnumCount;

use crate::CryptoCtxError;

/// Keyed-hash, MAC and plain digest transforms.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum_macros::EnumCount, strum_macros::FromRepr)]
pub enum HashAlgoId {
    /// HMAC over MD5.
    HmacMd5 = 0,

    /// HMAC over SHA-256.
    HmacSha256 = 1,

    /// CMAC over AES-128.
    CmacAes = 2,

    /// SHA-512 digest.
    Sha512 = 3,

    /// MD4 digest.
    Md4 = 4,

    /// MD5 digest.
    Md5 = 5,
}

impl HashAlgoId {
    /// Provider transform name for this identifier.
    pub fn transform_name(self) -> &'static str {
        match self {
            HashAlgoId::HmacMd5 => "hmac(md5)",
            HashAlgoId::HmacSha256 => "hmac(sha256)",
            HashAlgoId::CmacAes => "cmac(aes)",
            HashAlgoId::Sha512 => "sha512",
            HashAlgoId::Md4 => "md4",
            HashAlgoId::Md5 => "md5",
        }
    }
}

/// Authenticated-encryption transforms.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum_macros::EnumCount, strum_macros::FromRepr)]
pub enum AeadAlgoId {
    /// AES-128 in Galois/Counter mode.
    Aes128Gcm = 0,

    /// AES-128 in Counter with CBC-MAC mode.
    Aes128Ccm = 1,
}

impl AeadAlgoId {
    /// Provider transform name for this identifier.
    pub fn transform_name(self) -> &'static str {
        match self {
            AeadAlgoId::Aes128Gcm => "gcm(aes)",
            AeadAlgoId::Aes128Ccm => "ccm(aes)",
        }
    }
}

/// Legacy block-cipher transforms.
///
/// Only usable in a context when the `legacy-blkcipher` feature is enabled.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum_macros::EnumCount, strum_macros::FromRepr)]
pub enum BlkCipherAlgoId {
    /// Single DES in ECB mode.
    EcbDes = 0,
}

impl BlkCipherAlgoId {
    /// Provider transform name for this identifier.
    pub fn transform_name(self) -> &'static str {
        match self {
            BlkCipherAlgoId::EcbDes => "ecb(des)",
        }
    }
}

/// Algorithm family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AlgoFamily {
    /// Keyed-hash and digest transforms.
    Hash,

    /// Authenticated-encryption transforms.
    Aead,

    /// Legacy block-cipher transforms.
    BlkCipher,
}

impl AlgoFamily {
    /// Number of identifiers in this family.
    pub fn count(self) -> usize {
        match self {
            AlgoFamily::Hash => HashAlgoId::COUNT,
            AlgoFamily::Aead => AeadAlgoId::COUNT,
            AlgoFamily::BlkCipher => BlkCipherAlgoId::COUNT,
        }
    }

    /// Whether contexts built by this crate carry slots for this family.
    pub fn is_enabled(self) -> bool {
        match self {
            AlgoFamily::Hash | AlgoFamily::Aead => true,
            AlgoFamily::BlkCipher => cfg!(feature = "legacy-blkcipher"),
        }
    }
}

/// Algorithm identifier qualified by its family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AlgoId {
    /// Keyed-hash or digest transform.
    Hash(HashAlgoId),

    /// Authenticated-encryption transform.
    Aead(AeadAlgoId),

    /// Legacy block-cipher transform.
    BlkCipher(BlkCipherAlgoId),
}

impl AlgoId {
    /// Validates a raw identifier against its family's enumeration bound.
    ///
    /// # Arguments
    ///
    /// * `family` - The family the identifier belongs to
    /// * `raw` - The numeric identifier within the family
    ///
    /// # Errors
    ///
    /// * `CryptoCtxError::UnsupportedAlgorithm` - `raw` is out of range.
    pub fn from_raw(family: AlgoFamily, raw: u32) -> Result<Self, CryptoCtxError> {
        let id = match family {
            AlgoFamily::Hash => HashAlgoId::from_repr(raw).map(AlgoId::Hash),
            AlgoFamily::Aead => AeadAlgoId::from_repr(raw).map(AlgoId::Aead),
            AlgoFamily::BlkCipher => BlkCipherAlgoId::from_repr(raw).map(AlgoId::BlkCipher),
        };

        id.ok_or_else(|| {
            tracing::debug!(?family, raw, "Rejecting out-of-range algorithm identifier");
            CryptoCtxError::UnsupportedAlgorithm
        })
    }

    /// Family of this identifier.
    pub fn family(self) -> AlgoFamily {
        match self {
            AlgoId::Hash(_) => AlgoFamily::Hash,
            AlgoId::Aead(_) => AlgoFamily::Aead,
            AlgoId::BlkCipher(_) => AlgoFamily::BlkCipher,
        }
    }

    /// Provider transform name for this identifier.
    pub fn transform_name(self) -> &'static str {
        match self {
            AlgoId::Hash(id) => id.transform_name(),
            AlgoId::Aead(id) => id.transform_name(),
            AlgoId::BlkCipher(id) => id.transform_name(),
        }
    }
}

impl From<HashAlgoId> for AlgoId {
    fn from(id: HashAlgoId) -> Self {
        AlgoId::Hash(id)
    }
}

impl From<AeadAlgoId> for AlgoId {
    fn from(id: AeadAlgoId) -> Self {
        AlgoId::Aead(id)
    }
}

impl From<BlkCipherAlgoId> for AlgoId {
    fn from(id: BlkCipherAlgoId) -> Self {
        AlgoId::BlkCipher(id)
    }
}
