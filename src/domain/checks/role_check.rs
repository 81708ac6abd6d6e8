//! Role comparison check.

use async_trait::async_trait;
use tracing::debug;

use super::{Check, CheckContext, CheckOperation};
use crate::domain::directory::ConfiguredRole;
use crate::domain::error::Result;
use crate::domain::types::Role;

/// The role a [`RoleCheck`] compares against.
#[derive(Debug, Clone)]
pub enum RoleRef {
    /// A concrete role.
    Role(Role),
    /// A configured role, resolved through the directory on every check.
    Configured(ConfiguredRole),
}

/// Check against the roles of the message author.
///
/// Single-value operators compare the reference role (left side) with the
/// author's top role (right side), so `Higher` passes when the reference
/// outranks the author. An author with no roles ranks below everything.
///
/// `Contains`/`NotContains` test whether the reference role is among all of
/// the author's roles.
///
/// Events without a message, and authors who aren't guild members, fail.
pub struct RoleCheck {
    role: RoleRef,
    operation: CheckOperation,
}

impl RoleCheck {
    pub fn new(role: Role, operation: CheckOperation) -> Self {
        Self {
            role: RoleRef::Role(role),
            operation,
        }
    }

    pub fn configured(role: ConfiguredRole, operation: CheckOperation) -> Self {
        Self {
            role: RoleRef::Configured(role),
            operation,
        }
    }

    fn resolve(&self, ctx: &CheckContext<'_>) -> Result<Role> {
        match &self.role {
            RoleRef::Role(role) => Ok(role.clone()),
            RoleRef::Configured(kind) => ctx.directory.role(*kind),
        }
    }
}

#[async_trait]
impl Check for RoleCheck {
    fn name(&self) -> String {
        let role = match &self.role {
            RoleRef::Role(role) => role.name.clone(),
            RoleRef::Configured(kind) => kind.to_string(),
        };
        format!("role {} {}", self.operation, role)
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        let Some(message) = ctx.message() else {
            return Ok(false);
        };

        let role = self.resolve(ctx)?;
        let Some(roles) = ctx.directory.member_roles(message.author.id) else {
            debug!(user = %message.author.id, "Failing check: author is not a member");
            return Ok(false);
        };

        let result = if self.operation.for_collection() {
            self.operation.compare_collection(&role, &roles)
        } else {
            let top = roles.iter().max();
            self.operation.compare(&role, top)
        };

        debug!(
            "{} {} [{} roles] -> {}",
            role.name,
            self.operation,
            roles.len(),
            result
        );

        Ok(result)
    }
}
