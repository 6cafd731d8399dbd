//! Random tokens handed to users: account confirmation codes and temporary passwords.

use rand::Rng;
use rand::distributions::Alphanumeric;

pub const CONFIRMATION_LEN: usize = 24;
pub const TEMP_PASSWORD_LEN: usize = 8;

/// Random `[A-Za-z0-9]` string of `len` characters.
pub fn random_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn confirmation_code() -> String {
    random_token(&mut rand::thread_rng(), CONFIRMATION_LEN)
}

pub fn temporary_password() -> String {
    random_token(&mut rand::thread_rng(), TEMP_PASSWORD_LEN)
}
