//! Typed operations over the raw request plumbing.
//!
//! Each submodule adds an `impl` block on [`Client`](super::core::Client)
//! for one capability. Every operation gates on initialization before
//! touching the wire.

mod completion;
mod connection;
mod prompts;
mod resources;
mod tools;
