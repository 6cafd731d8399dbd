//! Keyed SHA-256 password encoder. Implements PasswordEncoder.
//!
//! Output is the lowercase hex digest of `code_word ":" password`.

use crate::ports::PasswordEncoder;
use sha2::{Digest, Sha256};

pub struct ShaPasswordEncoder {
    code_word: String,
}

impl ShaPasswordEncoder {
    /// `code_word` is the site-wide secret mixed into every digest.
    pub fn new(code_word: impl Into<String>) -> Self {
        Self {
            code_word: code_word.into(),
        }
    }
}

impl PasswordEncoder for ShaPasswordEncoder {
    fn encode(&self, plain: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.code_word.as_bytes());
        hasher.update(b":");
        hasher.update(plain.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_and_keyed() {
        let a = ShaPasswordEncoder::new("segredo");
        let b = ShaPasswordEncoder::new("outro");
        assert_eq!(a.encode("senha123"), a.encode("senha123"));
        assert_ne!(a.encode("senha123"), b.encode("senha123"));
        assert_ne!(a.encode("senha123"), a.encode("senha124"));
        assert_eq!(a.encode("x").len(), 64);
    }
}
