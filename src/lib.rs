pub mod config;
pub mod decode;
pub mod error;
pub mod interactive;
pub mod prompt;
pub mod signals;
pub mod sink;
pub mod source;
pub mod tagger;
pub mod tags;

pub use error::{Result, TaggerError};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over `default_level`. Diagnostics go to
/// stderr so they do not interleave with the operator's stdout stream.
///
/// Note: This function can only be called once.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
