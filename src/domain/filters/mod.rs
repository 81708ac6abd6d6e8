//! Message content filters.

mod attachment_filter;
mod chain;
mod domain_filter;
mod embed_filter;
mod filter_trait;
mod invite_filter;
mod regex_filter;

pub use attachment_filter::AttachmentFilter;
pub use chain::{ChainOutcome, FilterChain, Trigger};
pub use domain_filter::{DomainFilter, LinkInfo};
pub use embed_filter::EmbedFilter;
pub use filter_trait::{
    Filter, FilterConcern, FilterContext, PRIORITY_ACTIONING, PRIORITY_INFORMATIONAL,
};
pub use invite_filter::InviteFilter;
pub use regex_filter::RegexFilter;
