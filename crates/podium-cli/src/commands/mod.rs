//! CLI command implementations.

pub mod challenges;
pub mod flush;
pub mod photo;
pub mod reset;
pub mod status;
pub mod submit;
pub mod sync;
