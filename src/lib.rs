//! An async client for the keys API of etcd v2 compatible stores
//!
//! This library covers the key-operation semantics of the store's HTTP interface: reads,
//! writes, deletes, conditional mutations and long-poll change notification.
//!
//! # Features
//! - Typed, per-operation options; only the fields an operation understands reach the wire
//! - Conditional writes: `create` (must not exist), `update` (must exist),
//!   `compare_and_swap` (value must match), permissive `set`
//! - Directories and in-order keys
//! - Single watches and an infinite, lazily polled watch stream
//! - HTTP/1.1 and HTTP/2, TLS with optional certificate pinning, basic auth
//! - Pluggable transport through the [`Executor`] trait
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use etcd_keys_client::{Client, CreateOptions, GetOptions, SetOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), etcd_keys_client::Error> {
//!     let client = Client::new("http://127.0.0.1:2379")?;
//!
//!     // Unconditional write with a ttl
//!     client.set("/service/web", "10.0.0.7:80", SetOptions::with_ttl(30)).await?;
//!
//!     // Read it back
//!     let response = client.get("/service/web", GetOptions::default()).await?;
//!     println!("web = {:?}", response.value());
//!
//!     // Only succeeds if nobody created the lock first
//!     match client.create("/locks/deploy", CreateOptions::value("me")).await {
//!         Ok(_) => println!("lock acquired"),
//!         Err(e) if e.is_precondition_failed() => println!("lock held elsewhere"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod error;
pub mod executor;
mod keys;
pub mod options;
pub mod path;
pub mod request;
pub mod translate;
pub mod types;
mod watch;

#[cfg(test)]
mod mock;

pub use client::{Client, ClientConfig};
pub use error::{Error, Result, StoreError};
pub use executor::{Executor, HttpExecutor, RawResponse};
pub use options::{
    CreateOptions, DeleteOptions, GetOptions, SetOptions, SetValue, TtlOption, WatchOptions,
};
pub use request::KeyRequest;
pub use types::*;
