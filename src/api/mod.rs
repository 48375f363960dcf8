//! Network clients
//!
//! - http: retrying JSON request client over a pluggable transport
//! - homesso: registration-code sign-in endpoints

pub mod homesso;
pub mod http;

pub use homesso::{HomeSsoClient, PollOutcome};
pub use http::{HttpError, RequestClient, RequestOptions};
