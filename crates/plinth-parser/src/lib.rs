//! Blueprint resolution: imports, merging, derivation, binding and validation

pub mod binding;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hierarchy;
pub mod imports;
pub mod intrinsics;
pub mod merge;
pub mod pipeline;
pub mod policies;
pub mod topology;
pub mod yaml;

pub use config::ParserConfig;
pub use error::{ConfigError, FetchError};
#[cfg(feature = "remote")]
pub use fetch::HttpFetcher;
pub use fetch::{FileFetcher, Fetcher, MemoryFetcher};
pub use imports::ImportResolver;
pub use pipeline::{parse_from_path, parse_from_str, BlueprintParser};
pub use yaml::parse_document;
