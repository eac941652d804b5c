//! Common utilities for the aChor classification toolkit

pub mod error;

pub use error::{suggest_field, Error, Result};
