//! Core data model: the mutable MIME part tree and sender address extraction.

pub mod address;
pub mod part;
