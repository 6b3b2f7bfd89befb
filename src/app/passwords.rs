use actix_web::web;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2
};
use log::error;
use rand::distributions::{Alphanumeric, DistString};
use super::error::Error;

pub const TEMPORARY_PASSWORD_LENGTH: usize = 10;

// PHC string, salt included.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| {
      error!("Could not hash a password - {}", e);
      Error::InternalServerError(String::from("Password hashing failed"))
    })
}

// Anything that isn't a valid hash just doesn't match.
pub fn verify_password(password: &str, hash: &str) -> bool {
  match PasswordHash::new(hash) {
    Ok(parsed) => Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok(),
    Err(_) => false
  }
}

// Argon2 is slow on purpose, handlers run it on the
// blocking thread pool so the worker keeps serving.
pub async fn hash_password_blocking(password: String) -> Result<String, Error> {
  web::block(move || hash_password(&password))
    .await
    .map_err(|e| {
      error!("Password hashing task failed - {}", e);
      Error::InternalServerError(String::from("Password hashing failed"))
    })?
}

pub async fn verify_password_blocking(password: String, hash: String) -> bool {
  match web::block(move || verify_password(&password, &hash)).await {
    Ok(matches) => matches,
    Err(e) => {
      error!("Password verification task failed - {}", e);
      false
    }
  }
}

// Alphanumeric only so it can be read off the screen.
pub fn temporary_password() -> String {
  Alphanumeric.sample_string(&mut rand::rngs::OsRng, TEMPORARY_PASSWORD_LENGTH)
}
