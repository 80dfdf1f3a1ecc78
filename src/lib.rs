//! solution-deployer: command line glue around `solution-deployer-core`.
//!
//! Holds everything that touches the outside world: config loading, the
//! `reqwest` client implementing the portal contract and the hub site remover.

pub mod cli;
pub mod hub;
pub mod load_config;
pub mod portal_client;

pub use cli::{run, Cli, Commands};
