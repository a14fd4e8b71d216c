//! Domain types - configuration shared by the pipeline, the pool and the CLI.

pub mod config;
