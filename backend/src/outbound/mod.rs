//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed stores using Diesel ORM
//!
//! Adapters are thin translators between domain types and storage rows. They
//! contain no business logic.

pub mod persistence;
