//! Client for the third-party link-resolution API.
//!
//! Turns a share link into a direct download URL, a file name and an
//! optional thumbnail URL, and fetches thumbnail bytes.

pub mod client;
pub mod types;

pub use client::{Client, Error};
pub use types::ResolvedLink;
