//! # Keygate Testkit
//!
//! Testing utilities for Keygate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a fully wired [`Keygate`](keygate::Keygate) over a manual
//!   clock, an in-memory store and in-memory audit and alert sinks
//! - **Fault injection**: [`FailingStore`] wraps any store and fails or
//!   stalls calls on demand
//! - **Generators**: proptest strategies for subjects, validity periods and
//!   token-shaped input
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keygate_testkit::fixtures::{subject, TestFixture};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let fx = TestFixture::new();
//! let token = fx.issue(30).await;
//! let alice = subject("alice");
//!
//! fx.gate.redeem(&alice, &token).await.unwrap();
//! assert!(fx.gate.is_entitled(&alice).await);
//! # });
//! ```

pub mod failing;
pub mod fixtures;
pub mod generators;

pub use failing::FailingStore;
pub use fixtures::{codec, fixture_config, start_date, subject, TestFixture, ADMIN, TEST_SECRET};
