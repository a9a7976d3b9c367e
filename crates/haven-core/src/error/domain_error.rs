//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Guild not found: {0}")]
    GuildNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Role not found: {0}")]
    RoleNotFound(Snowflake),

    #[error("Member not found in guild")]
    MemberNotFound,

    #[error("Channel override not found")]
    OverrideNotFound,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown permission flag: {0}")]
    UnknownPermissionFlag(String),

    #[error("Invalid permissions: {0}")]
    InvalidPermissions(String),

    #[error("Override both allows and denies: {0}")]
    OverlappingOverride(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Missing permission: {0}")]
    MissingPermission(String),

    #[error("Not guild owner")]
    NotGuildOwner,

    #[error("Cannot modify higher role")]
    CannotModifyHigherRole,

    #[error("Cannot grant permissions you do not have: {0}")]
    CannotEscalate(String),

    #[error("Cannot modify @everyone role")]
    CannotModifyEveryoneRole,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Already a member of this guild")]
    AlreadyMember,

    #[error("Already has this role")]
    AlreadyHasRole,

    #[error("Channel is already locked")]
    ChannelAlreadyLocked,

    #[error("Channel is not locked")]
    ChannelNotLocked,

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Cannot delete @everyone role")]
    CannotDeleteEveryoneRole,

    #[error("Cannot manage guild owner")]
    CannotManageOwner,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::GuildNotFound(_) => "UNKNOWN_GUILD",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::RoleNotFound(_) => "UNKNOWN_ROLE",
            Self::MemberNotFound => "UNKNOWN_MEMBER",
            Self::OverrideNotFound => "UNKNOWN_OVERRIDE",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::UnknownPermissionFlag(_) => "UNKNOWN_PERMISSION_FLAG",
            Self::InvalidPermissions(_) => "INVALID_PERMISSIONS",
            Self::OverlappingOverride(_) => "OVERLAPPING_OVERRIDE",

            // Authorization
            Self::MissingPermission(_) => "MISSING_PERMISSIONS",
            Self::NotGuildOwner => "NOT_GUILD_OWNER",
            Self::CannotModifyHigherRole => "CANNOT_MODIFY_HIGHER_ROLE",
            Self::CannotEscalate(_) => "CANNOT_ESCALATE",
            Self::CannotModifyEveryoneRole => "CANNOT_MODIFY_EVERYONE_ROLE",

            // Conflict
            Self::AlreadyMember => "ALREADY_MEMBER",
            Self::AlreadyHasRole => "ALREADY_HAS_ROLE",
            Self::ChannelAlreadyLocked => "CHANNEL_ALREADY_LOCKED",
            Self::ChannelNotLocked => "CHANNEL_NOT_LOCKED",

            // Business Rules
            Self::CannotDeleteEveryoneRole => "CANNOT_DELETE_EVERYONE_ROLE",
            Self::CannotManageOwner => "CANNOT_MANAGE_OWNER",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GuildNotFound(_)
                | Self::ChannelNotFound(_)
                | Self::RoleNotFound(_)
                | Self::MemberNotFound
                | Self::OverrideNotFound
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::UnknownPermissionFlag(_)
                | Self::InvalidPermissions(_)
                | Self::OverlappingOverride(_)
                | Self::CannotDeleteEveryoneRole
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::MissingPermission(_)
                | Self::NotGuildOwner
                | Self::CannotModifyHigherRole
                | Self::CannotEscalate(_)
                | Self::CannotModifyEveryoneRole
                | Self::CannotManageOwner
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyMember
                | Self::AlreadyHasRole
                | Self::ChannelAlreadyLocked
                | Self::ChannelNotLocked
        )
    }
}
