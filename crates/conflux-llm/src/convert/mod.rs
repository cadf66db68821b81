//! Conversion from provider-agnostic requests to vendor request bodies
//!
//! Each submodule handles one vendor family's request layout. Responses are
//! folded by the decoders in [`crate::decode`].

pub mod anthropic;
pub mod google;
pub mod openai;
