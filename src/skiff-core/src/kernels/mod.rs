pub mod comparison;
pub mod hashing;
