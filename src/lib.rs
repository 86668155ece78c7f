//! Maintenance tooling for the In Lieu of Fun episode catalog.
//!
//! The catalog lives in a static-site repository as one front-matter file
//! per episode plus a guest registry. This crate keeps it current from the
//! host's announcement posts, the video platform and the audio feed.

pub mod atomic;
pub mod captions;
pub mod config;
pub mod dedup;
pub mod episode;
pub mod error;
pub mod feed;
pub mod guest;
pub mod links;
pub mod pipeline;
pub mod poller;
pub mod repo;
pub mod scan;
pub mod schedule;
pub mod site;
pub mod social;
pub mod synth;
pub mod text;
pub mod video;

pub use error::{CatalogError, Result};

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "ilof_catalog=info,ilof=info";

/// Installs the log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
