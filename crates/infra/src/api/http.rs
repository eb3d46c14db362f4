use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::from_str;
use tracing::debug;

use replytree_core::domain::reply::Reply;
use replytree_core::types::ids::{ReplyId, TopicId};

use super::dto::{
    CreateReplyBody, DeleteResponse, LikeDto, RepliesEnvelope, ReplyDto, UpdateReplyBody,
};
use super::{ApiError, LikeState, ReplyApi};

const USER_AGENT: &str = "replytree";

/// JSON REST client for the forum backend.
#[derive(Debug, Clone)]
pub struct HttpReplyApi {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpReplyApi {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        token: Option<String>,
    ) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let parsed = Url::parse(trimmed)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self {
            http,
            base_url: parsed,
            token: token.filter(|value| !value.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "api request");
        let builder = self
            .http
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");
        Ok(match self.token.as_deref() {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        })
    }

    async fn send<T>(&self, builder: RequestBuilder) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        from_str(&body).map_err(|err| ApiError::InvalidResponse(format!("{err}: {body}")))
    }
}

#[async_trait]
impl ReplyApi for HttpReplyApi {
    async fn fetch_replies(&self, topic: &TopicId) -> Result<Vec<Reply>, ApiError> {
        let builder = self.request(Method::GET, &["topics", topic.as_str(), "replies"])?;
        let envelope: RepliesEnvelope = self.send(builder).await?;
        envelope
            .replies
            .into_iter()
            .map(|dto| dto.into_reply(topic))
            .collect()
    }

    async fn create_reply(
        &self,
        topic: &TopicId,
        content: &str,
        parent: Option<&ReplyId>,
    ) -> Result<Reply, ApiError> {
        let body = CreateReplyBody {
            content,
            parent_id: parent.map(ReplyId::as_str),
        };
        let builder = self
            .request(Method::POST, &["topics", topic.as_str(), "replies"])?
            .json(&body);
        let dto: ReplyDto = self.send(builder).await?;
        dto.into_reply(topic)
    }

    async fn update_reply(&self, id: &ReplyId, content: &str) -> Result<Reply, ApiError> {
        let builder = self
            .request(Method::PUT, &["replies", id.as_str()])?
            .json(&UpdateReplyBody { content });
        let dto: ReplyDto = self.send(builder).await?;
        let topic = match dto.topic_id.as_deref() {
            Some(raw) => TopicId::try_from(raw)
                .map_err(|err| ApiError::InvalidResponse(format!("topic id: {err}")))?,
            None => return Err(ApiError::InvalidResponse(format!("reply {id} has no topic"))),
        };
        dto.into_reply(&topic)
    }

    async fn delete_reply(&self, id: &ReplyId) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &["replies", id.as_str()])?;
        let response: DeleteResponse = self.send(builder).await?;
        if !response.success {
            return Err(ApiError::Rejected("delete"));
        }
        Ok(())
    }

    async fn toggle_like(&self, id: &ReplyId) -> Result<LikeState, ApiError> {
        let builder = self.request(Method::POST, &["replies", id.as_str(), "like"])?;
        let like: LikeDto = self.send(builder).await?;
        Ok(like.into())
    }
}
