//! Primitive types describing listed keys.
//!
//! This module provides the enumeration of OpenPGP public key
//! algorithms as they appear in machine-readable keyserver listings.

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// The public key algorithms as defined in [Section 9.1 of RFC 4880].
///
///   [Section 9.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.1
///
/// The values can be converted into and from the numeric codes used
/// in the machine-readable index format.
///
/// Use [`PublicKeyAlgorithm::from`] to translate a numeric value to a
/// symbolic one.
///
///   [`PublicKeyAlgorithm::from`]: std::convert::From
///
/// Note: This enum cannot be exhaustively matched to allow future
/// extensions.
///
/// # Examples
///
/// ```rust
/// use hkp_client::PublicKeyAlgorithm;
///
/// assert_eq!(PublicKeyAlgorithm::from(17), PublicKeyAlgorithm::DSA);
/// assert_eq!(PublicKeyAlgorithm::DSA.to_string(), "DSA");
/// ```
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt or Sign)
    RSAEncryptSign,
    /// RSA Encrypt-Only, deprecated in RFC 4880.
    RSAEncrypt,
    /// RSA Sign-Only, deprecated in RFC 4880.
    RSASign,
    /// ElGamal (Encrypt-Only)
    ElGamalEncrypt,
    /// DSA (Digital Signature Algorithm)
    DSA,
    /// Elliptic curve Diffie-Hellman
    ECDH,
    /// Elliptic curve digital signing algorithm
    ECDSA,
    /// ElGamal (Encrypt or Sign), deprecated in RFC 4880.
    ElGamalEncryptSign,
    /// X9.42 Diffie-Hellman, reserved in RFC 4880.
    DiffieHellman,
    /// EdDSA
    EdDSA,
    /// Private algorithm identifier.
    Private(u32),
    /// Unknown algorithm identifier.
    Unknown(u32),
}

const PUBLIC_KEY_ALGORITHM_VARIANTS: [PublicKeyAlgorithm; 10] = [
    PublicKeyAlgorithm::RSAEncryptSign,
    PublicKeyAlgorithm::RSAEncrypt,
    PublicKeyAlgorithm::RSASign,
    PublicKeyAlgorithm::ElGamalEncrypt,
    PublicKeyAlgorithm::DSA,
    PublicKeyAlgorithm::ECDH,
    PublicKeyAlgorithm::ECDSA,
    PublicKeyAlgorithm::ElGamalEncryptSign,
    PublicKeyAlgorithm::DiffieHellman,
    PublicKeyAlgorithm::EdDSA,
];

impl From<u32> for PublicKeyAlgorithm {
    fn from(u: u32) -> Self {
        use self::PublicKeyAlgorithm::*;
        match u {
            1 => RSAEncryptSign,
            2 => RSAEncrypt,
            3 => RSASign,
            16 => ElGamalEncrypt,
            17 => DSA,
            18 => ECDH,
            19 => ECDSA,
            20 => ElGamalEncryptSign,
            21 => DiffieHellman,
            22 => EdDSA,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<PublicKeyAlgorithm> for u32 {
    fn from(p: PublicKeyAlgorithm) -> u32 {
        use self::PublicKeyAlgorithm::*;
        match p {
            RSAEncryptSign => 1,
            RSAEncrypt => 2,
            RSASign => 3,
            ElGamalEncrypt => 16,
            DSA => 17,
            ECDH => 18,
            ECDSA => 19,
            ElGamalEncryptSign => 20,
            DiffieHellman => 21,
            EdDSA => 22,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::PublicKeyAlgorithm::*;
        match *self {
            RSAEncryptSign => f.write_str("RSA Encrypt or Sign"),
            RSAEncrypt => f.write_str("RSA Encrypt-Only"),
            RSASign => f.write_str("RSA Sign-Only"),
            ElGamalEncrypt => f.write_str("ElGamal Encrypt-Only"),
            DSA => f.write_str("DSA"),
            ECDH => f.write_str("Elliptic Curve"),
            ECDSA => f.write_str("ECDSA"),
            ElGamalEncryptSign => f.write_str("Formerly ElGamal Encrypt or Sign"),
            DiffieHellman => f.write_str("Diffie-Hellman"),
            EdDSA => f.write_str("EdDSA"),
            Private(_) => f.write_str("Private/Experimental algorithm"),
            Unknown(_) => f.write_str("Unknown"),
        }
    }
}

#[cfg(test)]
impl Arbitrary for PublicKeyAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u32::arbitrary(g).into()
    }
}

impl PublicKeyAlgorithm {
    /// Returns an iterator over all valid variants.
    ///
    /// Returns an iterator over all known variants.  This does not
    /// include the [`PublicKeyAlgorithm::Private`], or
    /// [`PublicKeyAlgorithm::Unknown`] variants.
    pub fn variants() -> impl Iterator<Item = Self> {
        PUBLIC_KEY_ALGORITHM_VARIANTS.iter().cloned()
    }
}
