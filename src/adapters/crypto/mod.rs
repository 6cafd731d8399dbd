pub mod sha_encoder;

pub use sha_encoder::ShaPasswordEncoder;
