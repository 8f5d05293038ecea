//! Visibility rule shared by the store and cache read paths.

use crate::domain::error::DomainError;
use crate::domain::types::AccessLevel;

/// Inactive banners are only served to admins.
pub fn ensure_visible(is_active: bool, access: AccessLevel) -> Result<(), DomainError> {
    if is_active || access.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Inactive)
    }
}
