//! A rust library of named reader/writer locks for storage orchestration.
//!
//! Storage operations that mutate a volume (or any other resource) must not run concurrently with other operations on the same resource, but operations on unrelated resources should proceed in parallel.
//! This crate provides a [`LockManager`](named_lock::LockManager) that grants exclusive or shared access to a resource identified by an arbitrary string name.
//!
//! ## Getting Started
//! - [`named_lock::LockManager`] is the named lock manager. [`named_lock`] details lock creation and reclamation.
//! - [`config`] holds the default [stale timeout](config::Config#stale-timeout) and reclamation options.
//! - [`observer`] has observers for logging and counting lock operations.
//! - [`client_factory`] is a replaceable constructor for storage backend clients.
//!
//! ## Example
//! ```rust
//! # use std::{sync::Arc, time::Duration};
//! use named_locks::named_lock::LockManager;
//!
//! let locks = Arc::new(LockManager::new(Duration::from_secs(600)));
//!
//! locks.write_lock("volume/vol1");
//! let writer = std::thread::spawn({
//!     let locks = locks.clone();
//!     move || {
//!         locks.write_lock("volume/vol1"); // blocks until the first writer unlocks
//!         locks.write_unlock("volume/vol1");
//!     }
//! });
//! locks.read_lock("volume/vol2"); // unrelated names are not blocked
//! locks.read_unlock("volume/vol2");
//! locks.write_unlock("volume/vol1");
//! writer.join().unwrap();
//! ```
//!
//! ## Reclamation
//! A lock is created for a name on first use and tracked with the time it was last locked or unlocked.
//! Names untouched for longer than the stale timeout are reclaimed by a reaper that runs inline with lock calls, on demand, or on a background thread.
//! By default a lock is never reclaimed while it is held or awaited, see [`ReapPolicy`](named_lock::ReapPolicy).
//!
//! ## Logging
//! Reclamation and unlock misuse are reported through [`tracing`] at `debug` and `warn` level.
//! This crate never installs a subscriber.
//!
//! ## Licence
//! `named_locks` is licensed under either of
//!  - the Apache License, Version 2.0 [LICENSE-APACHE](./LICENCE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license [LICENSE-MIT](./LICENCE-MIT) or <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod client_factory;
pub mod config;
pub mod named_lock;
pub mod observer;
