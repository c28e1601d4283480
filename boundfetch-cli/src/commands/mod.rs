//! CLI subcommands.

pub mod get;
pub mod transports;
