//! Allow/deny pair applied on top of base permissions within one channel

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::permissions::Permissions;

/// An (allow, deny) bitfield pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Overwrite {
    pub allow: Permissions,
    pub deny: Permissions,
}

impl Overwrite {
    pub const fn new(allow: Permissions, deny: Permissions) -> Self {
        Self { allow, deny }
    }

    /// Overwrite that only allows
    pub const fn allow(allow: Permissions) -> Self {
        Self::new(allow, Permissions::empty())
    }

    /// Overwrite that only denies
    pub const fn deny(deny: Permissions) -> Self {
        Self::new(Permissions::empty(), deny)
    }

    /// Write-side invariant: a flag is never both allowed and denied
    pub fn validate(&self) -> Result<(), DomainError> {
        let overlap = self.allow & self.deny;
        if overlap.is_empty() {
            Ok(())
        } else {
            Err(DomainError::OverlappingOverride(overlap.list().join(", ")))
        }
    }

    /// True when the overwrite changes nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// Clear denied bits, then set allowed bits.
    ///
    /// Allow wins for any flag present in both halves.
    #[inline]
    #[must_use]
    pub fn apply(&self, permissions: Permissions) -> Permissions {
        (permissions & !self.deny) | self.allow
    }
}
