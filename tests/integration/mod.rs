//! Integration tests for smartapi
//!
//! Each test starts an in-process server on an ephemeral port and talks to
//! it over real HTTP connections.
//!
//! Run with: cargo test --test integration

mod helpers;

mod binding;
mod responses;
mod routing;
mod server;
