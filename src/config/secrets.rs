//! Secret handling utilities.
//!
//! Re-exports secrecy types and provides helpers for working with
//! secrets in the caseflow context.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
