//! Outer collaborators of the payload engine: the [`StandardAdapter`] with
//! its wire-format codecs, user configuration, and HTTP fetching.

pub mod adapter;
pub mod codec;
pub mod config;
pub mod fetch;

pub use adapter::StandardAdapter;
pub use codec::{CodecError, format_from_extension};
pub use config::{CONFIG_PATH_ENV, ConfigError, PayloadConfig, default_config_path};
pub use fetch::{FetchError, fetch_payload, format_from_content_type, parse_response};
