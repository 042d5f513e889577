//! Transactional storage and query engine for the cocraft social platform.
//!
//! - [`domain`]: entities, store ports, validation and the collection facade
//! - [`outbound`]: PostgreSQL adapters for the ports
//! - [`config`]: settings loaded from the environment

pub mod config;
pub mod domain;
pub mod outbound;
