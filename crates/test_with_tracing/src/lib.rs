// Copyright (C) Microsoft Corporation. All rights reserved.

//! `#[test]` replacement whose tests emit `tracing` output.
//!
//! ```ignore
//! use test_with_tracing::test;
//!
//! #[test]
//! fn test_pool() {
//!     tracing::info!("captured by the test harness");
//! }
//! ```

// Test-only crate: `expect` is allowed here, `unwrap` is not.
#![allow(clippy::expect_used)]

#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
#[doc(hidden)]
pub use tracing;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

#[doc(hidden)]
/// Installs the test subscriber, once per test binary.
///
/// `RUST_LOG` selects targets; everything at `DEBUG` and above otherwise.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = match std::env::var("RUST_LOG") {
            Ok(var) => var
                .parse()
                .expect("Failed to parse RUST_LOG environment variable"),
            Err(_) => Targets::new().with_default(LevelFilter::DEBUG),
        };
        // Another subscriber may already be installed by the harness.
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .with_thread_ids(true)
            .finish()
            .with(targets)
            .try_init();
    });
}
