pub mod dto;
pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use replytree_core::domain::reply::Reply;
use replytree_core::types::ids::{ReplyId, TopicId};

pub use http::HttpReplyApi;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request failed: status {status}, body {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("server rejected {0}")]
    Rejected(&'static str),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}

/// Like status of one reply as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub like_count: u64,
}

/// Backend operations the reply tree depends on.
#[async_trait]
pub trait ReplyApi: Send + Sync {
    /// Replies of a topic, either flat or already nested.
    async fn fetch_replies(&self, topic: &TopicId) -> Result<Vec<Reply>, ApiError>;

    async fn create_reply(
        &self,
        topic: &TopicId,
        content: &str,
        parent: Option<&ReplyId>,
    ) -> Result<Reply, ApiError>;

    async fn update_reply(&self, id: &ReplyId, content: &str) -> Result<Reply, ApiError>;

    /// The backend removes descendants too.
    async fn delete_reply(&self, id: &ReplyId) -> Result<(), ApiError>;

    async fn toggle_like(&self, id: &ReplyId) -> Result<LikeState, ApiError>;
}
