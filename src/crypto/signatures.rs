//! Signature capability injected into transaction validation.
//!
//! The core never embeds a specific curve: everything that checks a signature
//! goes through [`TxVerifier`], and everything that produces one goes through
//! [`TxSigner`]. Production wires in ed25519; tests may use the permissive
//! verifier, which only insists that a signature is present.

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Verifies a signature over a transaction's canonical bytes.
///
/// `sender` is the transaction's sender address; implementations decide how an
/// address relates to key material.
pub trait TxVerifier: Send + Sync {
    fn verify(&self, sender: &str, message: &[u8], signature: &[u8]) -> bool;
}

/// Produces a signature over a transaction's canonical bytes.
pub trait TxSigner {
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// The address whose transactions this signer can authorize.
    fn address(&self) -> String;
}

/// Accepts any non-empty signature. Test mode only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveVerifier;

impl TxVerifier for PermissiveVerifier {
    fn verify(&self, _sender: &str, _message: &[u8], signature: &[u8]) -> bool {
        !signature.is_empty()
    }
}

/// Ed25519 verification where the sender address is the hex-encoded verifying
/// key, so no key registry is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl TxVerifier for Ed25519Verifier {
    fn verify(&self, sender: &str, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = hex::decode(sender) else {
            return false;
        };
        let Ok(key_arr) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_arr) else {
            return false;
        };

        let Ok(sig_arr) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_arr);

        verifying_key.verify(message, &signature).is_ok()
    }
}

/// Ed25519 signer holding a keypair; its address is the hex verifying key.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ed25519Signer { signing_key }
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Ed25519Signer {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl TxSigner for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    fn address(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }
}
