//! Azure plumbing: credentials, HTTP helpers and the REST client.

pub mod credential;
pub mod http;
pub mod rest;

pub use credential::{credential_from_config, AccessToken, TokenProvider};
pub use rest::RestClient;
