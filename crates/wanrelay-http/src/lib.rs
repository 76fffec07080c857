// # wanrelay-http
//
// Delivers address changes to user-defined HTTP callbacks.
//
// ## Flow
//
// 1. [`render`] substitutes the address and credentials into a template
// 2. [`deliver`] performs the call with bounded retries and backoff
// 3. [`HttpRequestsDestination`] runs every applicable template for an
//    event concurrently and waits for all of them
//
// ## Security Requirements
//
// - Passwords NEVER appear in logs or error messages
// - Log lines use the url/body as they were before credential substitution

pub mod client;
pub mod destination;
pub mod error;
pub mod render;

pub use client::{Backoff, DeliveryResult, deliver};
pub use destination::HttpRequestsDestination;
pub use error::DeliveryError;
pub use render::{RenderedRequest, render};
