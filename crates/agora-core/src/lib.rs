//! Core types, storage traits and components for the Agora social backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend (`agora-store-sqlite`) and the HTTP surface (`agora-api`)
//! both depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

mod bounded;

pub mod agora;
pub mod config;
pub mod content;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod like;
pub mod post;
pub mod session;
pub mod store;
pub mod user;

pub use agora::{Agora, LoginOutcome, Registration};
pub use config::CoreConfig;
pub use error::{AuthFailure, Error, ErrorKind, Result};
