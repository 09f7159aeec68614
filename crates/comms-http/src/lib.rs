//! # comms-http
//!
//! Request/response helpers for control-plane calls that do not need a
//! long-lived session: GET and POST with JSON bodies, where any status other
//! than 200 is an error.

#![deny(unsafe_code)]

pub mod client;
pub mod error;

pub use client::{JsonClient, get_json, post, post_json};
pub use error::{HttpError, Result};
