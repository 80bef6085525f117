//! shortgen - cut a video into vertical shorts
//!
//! This library crate exposes the command-line session logic for
//! integration testing.

pub mod output;
pub mod session;
