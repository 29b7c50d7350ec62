pub mod document;
pub mod hashing;
pub mod linkage;
pub mod registry;
