//! Cache invalidation for published content.
//!
//! - [`UrlResolver`] derives the URLs affected by a node change, including
//!   wildcard paths for dynamic widget routes.
//! - [`BanDispatcher`] sends each resolved ban to every registered
//!   [`BanServer`].
//! - [`BanScope`] collects published nodes during one request and flushes
//!   them once before the response is sent.

mod dispatcher;
mod entry;
mod error;
mod events;
mod resolver;
mod scope;

pub use dispatcher::{BanDispatcher, BanServer};
pub use entry::{BanEntry, BanSet, QUERY_WILDCARD};
pub use error::BanError;
pub use events::{PUBLISH_ACTION, PublishEvent, RequestContext};
pub use resolver::UrlResolver;
pub use scope::{BanScope, FlushSummary, ScopeState};
