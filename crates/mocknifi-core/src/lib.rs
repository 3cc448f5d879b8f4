//! # mocknifi Core
//!
//! Error handling and shared types for the mocknifi workspace:
//! - [`Error`] / [`Result`] used by every library crate
//! - [`EntryKind`] naming the two keystore entry kinds

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::EntryKind;
