#![forbid(unsafe_code)]
#![doc = "Common types and error codes for the helloext workspace."]

pub mod error;

pub use error::*;
