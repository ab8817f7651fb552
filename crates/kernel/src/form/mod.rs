//! Request forgery protection for listing follow-ups.
//!
//! The listing container carries a nonce; AJAX follow-up requests echo it
//! back and are answered only when it verifies.

pub mod nonce;

pub use nonce::{MIN_SECRET_LEN, NonceService};
