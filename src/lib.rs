// SPDX-License-Identifier: MPL-2.0

//! Nostr feed client core: relay filters for user-defined algorithms,
//! ordered feed lists, a request throttle, a per-user TTL cache and the
//! backend API client.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod feed;
pub mod format;
pub mod protocol;
pub mod relay;
pub mod runtime;
pub mod state;
