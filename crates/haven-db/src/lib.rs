//! # haven-db
//!
//! Storage layer implementing the haven-core repository traits.
//!
//! ## Overview
//!
//! Two backends are provided:
//!
//! - PostgreSQL via SQLx: connection pool, migrations, `FromRow` models,
//!   entity ↔ model mappers and the `Pg*Repository` types. Multi-row writes
//!   run in a transaction holding the guild's advisory lock.
//! - [`MemoryStore`]: one value implementing every repository trait, with
//!   a lock per guild. Used by tests and single-node deployments.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use haven_common::AppConfig;
//! use haven_db::{create_pool, run_migrations, PgRoleRepository};
//! use haven_core::traits::RoleRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let pool = create_pool(&config.database).await?;
//!     run_migrations(&pool).await?;
//!     let roles = PgRoleRepository::new(pool);
//!
//!     // Use the repository...
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations, PgPool};
pub use repositories::{
    PgAuditLogRepository, PgChannelRepository, PgGuildRepository, PgMemberRepository,
    PgOverrideRepository, PgRoleRepository, PgSnapshotRepository,
};
