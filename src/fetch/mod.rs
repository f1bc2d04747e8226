//! Conditional feed fetching
//!
//! [`ConditionalFetchCache`] remembers the validators of the last successful
//! response and decorates the next request with them; [`FeedClient`] sends that
//! request and hands back either "not modified" or a streaming body.

mod cache;
mod client;

pub use cache::{CacheValidators, ConditionalFetchCache};
pub use client::{FeedBody, FeedClient, FetchOutcome};
