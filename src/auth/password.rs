use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{invalid_field_error, Error};

const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(plain: &str) -> Result<String, Error> {
    if plain.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(invalid_field_error("password"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string();

    Ok(hash)
}

pub fn verify_password(plain: &str, hashed: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hashed)?;

    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[test]
fn hash_and_verify() {
    let hash = hash_password("correct horse").unwrap();

    assert_ne!(hash, "correct horse");
    assert!(verify_password("correct horse", &hash).unwrap());
    assert!(!verify_password("wrong horse", &hash).unwrap());
}

#[test]
fn short_passwords_are_rejected() {
    assert!(hash_password("short").unwrap_err().is_invalid_input_error());
}
