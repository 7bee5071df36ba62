// SPDX-License-Identifier: MPL-2.0

//! Where notes come from and where signed notes go.

mod memory;
mod pool;

pub use memory::MemorySource;
pub use pool::RelayPool;

use crate::protocol::{Note, RelayFilter};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("invalid filter: {0}")]
    Filter(#[from] serde_json::Error),
    #[error("invalid event: {0}")]
    Event(#[from] crate::protocol::EventError),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("relay unavailable: {0}")]
    Unavailable(String),
}

/// A queryable, writable set of relays.
pub trait EventSource: Send + Sync {
    /// Notes matching `filter`. Order is unspecified.
    fn fetch(&self, filter: &RelayFilter)
    -> impl Future<Output = Result<Vec<Note>, RelayError>> + Send;

    fn publish(&self, note: &Note) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Run several filters and concatenate the results.
    fn fetch_all(
        &self,
        filters: &[RelayFilter],
    ) -> impl Future<Output = Result<Vec<Note>, RelayError>> + Send {
        async move {
            let mut notes = Vec::new();
            for filter in filters {
                notes.extend(self.fetch(filter).await?);
            }
            Ok(notes)
        }
    }
}
