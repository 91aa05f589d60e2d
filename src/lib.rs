// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod error;
pub mod masker;
pub mod parser;
pub mod schema;
pub mod stream;

pub use error::{MaskError, Result};
pub use masker::{MaskStats, Masker, RunContext};
pub use stream::{mask_stream, StreamDriver};
