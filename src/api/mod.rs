// SPDX-License-Identifier: MPL-2.0

mod auth;
mod client;
mod types;

pub use auth::{create_auth_header, signing_payload};
pub use client::ApiClient;
pub use types::{AlgorithmPatch, JobState, JobStatus, SocialGraph, TrendingTopic, UploadResponse};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not logged in")]
    NotAuthenticated,
    #[error("job {job_id} did not finish after {polls} polls")]
    JobTimeout { job_id: String, polls: u32 },
}
