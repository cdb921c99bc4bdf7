//! Transfer PIN hashing.
//!
//! The PIN is a credential, so it is stored as a salted Argon2id hash and
//! checked with a verifier, never compared as plaintext.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::{LedgerError, ResultEngine};

/// PINs are exactly four ASCII digits.
pub(crate) fn validate_format(pin: &str) -> ResultEngine<()> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(LedgerError::InvalidPin(
            "pin must be four digits".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn hash(pin: &str) -> ResultEngine<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| LedgerError::InvalidPin(format!("failed to hash pin: {err}")))
}

pub(crate) fn verify(pin: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}
