//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the store ports backed by PostgreSQL via
//! `diesel-async` and `bb8` pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between Diesel rows and domain
//!   types. Validation and cross-store flows live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Atomic units**: multi-statement operations run through the
//!   transaction coordinator (`transaction.rs`), which retries transient
//!   conflicts.
//! - **Bounded calls**: every store operation runs within the pool's query
//!   budget and reports overruns as a timeout error.
//!
//! # Example
//!
//! ```ignore
//! use cocraft::domain::Collections;
//! use cocraft::outbound::persistence::{DbPool, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/cocraft")).await?;
//! let collections = Collections::diesel(pool, Arc::new(DefaultClock));
//! ```

use std::sync::Arc;

use mockable::Clock;

use crate::domain::Collections;

mod diesel_comment_repository;
mod diesel_follow_repository;
pub(crate) mod diesel_helpers;
mod diesel_post_repository;
mod diesel_review_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;
mod transaction;

pub use diesel_comment_repository::DieselCommentRepository;
pub use diesel_follow_repository::DieselFollowRepository;
pub use diesel_post_repository::DieselPostRepository;
pub use diesel_review_repository::DieselReviewRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

impl Collections {
    /// Assemble every store over one PostgreSQL pool.
    pub fn diesel(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(DieselUserRepository::new(pool.clone(), Arc::clone(&clock))),
            Arc::new(DieselPostRepository::new(pool.clone(), Arc::clone(&clock))),
            Arc::new(DieselCommentRepository::new(pool.clone(), Arc::clone(&clock))),
            Arc::new(DieselReviewRepository::new(pool.clone(), Arc::clone(&clock))),
            Arc::new(DieselFollowRepository::new(pool, clock)),
        )
    }
}
