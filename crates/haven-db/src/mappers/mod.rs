//! Entity to model mappers
//!
//! Conversions between domain entities (haven-core) and database models.
//! - `From<Model> for Entity`: rows that always map cleanly
//! - `TryFrom<Model> for Entity`: rows carrying enum discriminators stored as text

mod audit_log;
mod channel;
mod guild;
mod member;
mod overrides;
mod role;

pub use channel::pre_lock_columns;
