//! Password hashing with Argon2id
//!
//! Hashes are stored as PHC strings, so the salt and cost parameters travel
//! with the hash.

use crate::error::{BusinessError, BusinessResult};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    /// Argon2id with m=19456 KiB, t=2, p=1
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher {
    pub fn with_params(memory_kib: u32, iterations: u32) -> BusinessResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(|e| {
            BusinessError::PasswordHashing(format!("invalid Argon2 parameters: {e}"))
        })?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> BusinessResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| BusinessError::PasswordHashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch; a malformed stored hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> BusinessResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| BusinessError::PasswordHashing(format!("stored hash: {e}")))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(BusinessError::PasswordHashing(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::with_params(1024, 1).unwrap()
    }

    #[test]
    fn test_hash_is_salted_phc_string() {
        let hasher = cheap();
        let first = hasher.hash("secret1").unwrap();
        let second = hasher.hash("secret1").unwrap();

        assert!(first.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert_ne!(first, second);
        assert!(!first.contains("secret1"));
    }

    #[test]
    fn test_verify() {
        let hasher = cheap();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hasher.verify("secret1", &hash).unwrap());
        assert!(!hasher.verify("secret2", &hash).unwrap());
        assert!(matches!(
            hasher.verify("secret1", "not-a-phc-string"),
            Err(BusinessError::PasswordHashing(_))
        ));
    }

    #[test]
    fn test_verify_uses_parameters_in_hash() {
        let hash = cheap().hash("secret1").unwrap();
        assert!(PasswordHasher::default().verify("secret1", &hash).unwrap());
    }

    #[test]
    fn test_invalid_params() {
        assert!(PasswordHasher::with_params(1, 0).is_err());
    }
}
