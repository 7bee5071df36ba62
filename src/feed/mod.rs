// SPDX-License-Identifier: MPL-2.0

pub mod counts;
pub mod ordered;
pub mod throttle;

pub use counts::aggregate_counts;
pub use ordered::{insert_event_in_place, insert_event_into_descending_list};
pub use throttle::{RequestHandle, RequestQueue, ThrottleError};
