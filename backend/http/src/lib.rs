//! The HTTP collaborator of the command layer.
//!
//! `CommandHttp` is the seam the registry talks through; `RestClient` is the
//! production implementation on top of `reqwest`.

pub mod client;
pub mod error;
pub mod rest;

pub use client::CommandHttp;
pub use error::HttpError;
pub use rest::RestClient;
