pub mod config;

pub use config::{AssembleConfig, DEFAULT_LINK_ID_PREFIX, MissingVersionPolicy};
