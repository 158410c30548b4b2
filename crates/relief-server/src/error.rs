//! Configuration errors detected at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("account {0:?} is configured more than once")]
  DuplicateAccount(String),

  #[error("account {0:?} has a password_hash that is not an argon2 PHC string")]
  InvalidPasswordHash(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
