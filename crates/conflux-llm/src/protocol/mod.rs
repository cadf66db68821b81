//! Serde shapes of the three vendor families
//!
//! Request bodies only serialize and replies only deserialize. Nothing here
//! leaks past `convert` and `decode`.

pub mod anthropic;
pub mod google;
pub mod openai;
