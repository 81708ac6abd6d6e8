//! Composable predicates gating commands and event handlers.

mod channel_check;
mod check_trait;
mod default_check;
mod operation;
mod role_check;

pub use channel_check::{ChannelCheck, ChannelRef, ChannelTypeCheck};
pub use check_trait::{all, all_pass, any, any_pass, check_fn, All, Any, Check, CheckContext, FnCheck};
pub use default_check::DefaultCheck;
pub use operation::CheckOperation;
pub use role_check::{RoleCheck, RoleRef};
