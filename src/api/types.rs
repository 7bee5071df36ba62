// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// Partial update for a stored algorithm; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byo_posts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byo_reposts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byo_replies: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byo_reactions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byo_degrees: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Pubkeys reachable from `pubkey` within `degrees` follow hops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SocialGraph {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub degrees: u32,
    #[serde(default)]
    pub pubkeys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrendingTopic {
    #[serde(alias = "tag", alias = "name")]
    pub topic: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// A batch job as reported by `batch/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub id: String,
    pub status: JobState,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}
