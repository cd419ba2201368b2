//! Credential verification against stored bcrypt hashes.

pub use bcrypt::BcryptError;

/// Check a plaintext password against a stored bcrypt hash.
///
/// A mismatch is `Ok(false)`; only library or hash-format faults
/// produce an error, and an error is never a match.
///
/// # Errors
///
/// Returns an error if the stored hash cannot be parsed or the
/// algorithm fails.
pub fn verify_password(plain: &str, hashed: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(plain, hashed)
}

/// Hash a plaintext password with a fresh salt.
///
/// Provisioning path only; verification never re-hashes.
///
/// # Errors
///
/// Returns an error if the algorithm fails.
pub fn hash_password(plain: &str) -> Result<String, BcryptError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
}
