//! Permission checks between parsing and rendering.
//!
//! A [`PermissionPolicy`] receives the parsed [`Action`] and either rejects
//! it or hands back the action to execute, possibly rewritten with extra
//! filters or fewer columns. The rewritten action is authoritative: the
//! statement is rendered from what the policy returns.

mod policy;

pub use policy::{
    ColumnAction, ColumnPermission, Condition, ConnectorCondition, ExpressionCondition,
    PermissionFacts, StaticPolicy, TableAction, TableCondition, TablePermission,
};

use crate::action::Action;
use crate::error::Result;
use crate::metadata::SchemaProvider;

/// Outcome of a permission check.
#[derive(Debug)]
pub enum PermissionCheck {
    /// Execute this action.
    Pass(Action),
    /// Reject the request with a reason.
    Deny(String),
}

impl PermissionCheck {
    pub fn is_pass(&self) -> bool {
        matches!(self, PermissionCheck::Pass(_))
    }
}

/// Access policy consulted for every request.
pub trait PermissionPolicy: Send + Sync {
    fn check(&self, action: Action, schema: &dyn SchemaProvider) -> Result<PermissionCheck>;
}

/// Lets every request through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionPolicy for AllowAll {
    fn check(&self, action: Action, _schema: &dyn SchemaProvider) -> Result<PermissionCheck> {
        Ok(PermissionCheck::Pass(action))
    }
}
