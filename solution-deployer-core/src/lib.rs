#![doc = "solution-deployer-core: core logic library for solution-deployer."]

//! This crate contains the data model, the portal contract and every pipeline
//! used to capture platform items as templates, deploy them into a destination
//! organization and delete deployed Solutions again.
//! Transport-specific clients live in the binary crate; everything here talks to
//! the platform through the [`contract::Portal`] trait.
//!
//! # Usage
//! Add this as a dependency for all templating, deployment and deletion code.

pub mod build_order;
pub mod contract;
pub mod delete;
pub mod deploy;
pub mod error;
pub mod id_scanner;
pub mod item_types;
pub mod model;
pub mod progress;
pub mod templatization;

pub use error::{PortalError, SolutionError, SolutionResult};
