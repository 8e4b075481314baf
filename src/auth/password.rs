//! Password hashing and verification using Argon2id.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::prelude::*;
use rand::{rng, Rng};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Hashing failed: {0}")]
    HashingFailed(String),

    #[error("Verification failed: password does not match")]
    VerificationFailed,

    #[error("Invalid hash format")]
    InvalidHashFormat,

    #[error("Base64 decoding failed: {0}")]
    DecodingFailed(#[from] base64::DecodeError),
}

/// Configuration for Argon2id password hashing.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 15 MiB = 15360 KiB)
    pub memory_cost: u32,
    /// Number of iterations (default: 3)
    pub time_cost: u32,
    /// Number of lanes (default: 2)
    pub parallelism: u32,
    /// Length of the generated hash (default: 32 bytes)
    pub hash_length: u32,
    /// Length of the salt (default: 16 bytes)
    pub salt_length: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 15360, // 15 MiB
            time_cost: 3,
            parallelism: 2,
            hash_length: 32,
            salt_length: 16,
        }
    }
}

/// Hashes a password using Argon2id.
///
/// Output format: `$argon2id$v=19$m=15360,t=3,p=2$<salt_base64>$<hash_base64>`
pub fn hash_password(
    password: &SecretString,
    config: Option<PasswordConfig>,
) -> Result<SecretString, PasswordError> {
    let config = config.unwrap_or_default();

    // Generate a random salt
    let mut salt = vec![0u8; config.salt_length as usize];
    rng().fill_bytes(&mut salt);

    let mut output = vec![0u8; config.hash_length as usize];
    build_argon2(&config)?
        .hash_password_into(password.expose_secret().as_bytes(), &salt, &mut output)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    let salt_b64 = BASE64_STANDARD.encode(&salt);
    let hash_b64 = BASE64_STANDARD.encode(&output);

    let hash_format = format!(
        "$argon2id$v=19$m={},t={},p={}${}${}",
        config.memory_cost, config.time_cost, config.parallelism, salt_b64, hash_b64
    );

    Ok(SecretString::from(hash_format))
}

/// Verifies a password against a stored hash.
///
/// Re-derives the hash with the stored salt and parameters and compares in
/// constant time.
pub fn verify_password(
    password: &SecretString,
    expected_hash: &str,
) -> Result<(), PasswordError> {
    let parts: Vec<&str> = expected_hash.split('$').collect();
    // ["", "argon2id", "v=19", "m=..,t=..,p=..", salt, hash]
    if parts.len() != 6 || parts[1] != "argon2id" || parts[2] != "v=19" {
        return Err(PasswordError::InvalidHashFormat);
    }

    let mut memory_cost = None;
    let mut time_cost = None;
    let mut parallelism = None;
    for param in parts[3].split(',') {
        match param.split_once('=') {
            Some(("m", v)) => memory_cost = v.parse::<u32>().ok(),
            Some(("t", v)) => time_cost = v.parse::<u32>().ok(),
            Some(("p", v)) => parallelism = v.parse::<u32>().ok(),
            _ => return Err(PasswordError::InvalidHashFormat),
        }
    }

    let salt = BASE64_STANDARD.decode(parts[4])?;
    let expected = BASE64_STANDARD.decode(parts[5])?;

    let config = PasswordConfig {
        memory_cost: memory_cost.ok_or(PasswordError::InvalidHashFormat)?,
        time_cost: time_cost.ok_or(PasswordError::InvalidHashFormat)?,
        parallelism: parallelism.ok_or(PasswordError::InvalidHashFormat)?,
        hash_length: expected.len() as u32,
        salt_length: salt.len() as u32,
    };

    let mut actual = vec![0u8; expected.len()];
    build_argon2(&config)?
        .hash_password_into(password.expose_secret().as_bytes(), &salt, &mut actual)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    if actual.ct_eq(&expected).into() {
        Ok(())
    } else {
        Err(PasswordError::VerificationFailed)
    }
}

fn build_argon2(config: &PasswordConfig) -> Result<Argon2<'static>, PasswordError> {
    Ok(Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            Some(config.hash_length as usize),
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters so the test suite stays fast
    fn test_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            hash_length: 32,
            salt_length: 16,
        }
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let password = SecretString::from("correct horse battery staple".to_string());
        let hash = hash_password(&password, Some(test_config())).unwrap();

        assert!(hash.expose_secret().starts_with("$argon2id$v=19$"));
        assert!(verify_password(&password, hash.expose_secret()).is_ok());
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let password = SecretString::from("right password".to_string());
        let hash = hash_password(&password, Some(test_config())).unwrap();

        let wrong = SecretString::from("wrong password".to_string());
        assert!(matches!(
            verify_password(&wrong, hash.expose_secret()),
            Err(PasswordError::VerificationFailed)
        ));
    }

    #[test]
    fn test_invalid_hash_format_is_rejected() {
        let password = SecretString::from("anything".to_string());
        assert!(matches!(
            verify_password(&password, "not-a-hash"),
            Err(PasswordError::InvalidHashFormat)
        ));
        assert!(matches!(
            verify_password(&password, "$md5$v=19$m=1,t=1,p=1$AAAA$BBBB"),
            Err(PasswordError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let password = SecretString::from("same password".to_string());
        let h1 = hash_password(&password, Some(test_config())).unwrap();
        let h2 = hash_password(&password, Some(test_config())).unwrap();
        assert_ne!(h1.expose_secret(), h2.expose_secret());
    }
}
