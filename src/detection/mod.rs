pub mod extractor;

pub use extractor::extract_attacker_address;
