// # wanrelay-push
//
// Routers that cannot be polled can push their addresses instead. This
// crate serves a single `/ip` endpoint that authenticates the caller, reads
// `v4`, `v6` or `prefix` from the query string, and forwards the resulting
// addresses to the dispatcher.
//
// ## Security Requirements
//
// - Credentials are compared in constant time
// - Supplied and configured credentials are never logged

pub mod auth;
pub mod config;
pub mod server;

pub use config::PushConfig;
pub use server::{router, serve};
