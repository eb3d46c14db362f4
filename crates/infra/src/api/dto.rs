use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use replytree_core::domain::reply::{AuthorSummary, Reply};
use replytree_core::types::ids::{ReplyId, TopicId, UserId};

use super::{ApiError, LikeState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDto {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorDto>,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<ReplyDto>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "avatar")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepliesEnvelope {
    pub replies: Vec<ReplyDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyBody<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateReplyBody<'a> {
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeDto {
    pub is_liked: bool,
    pub like_count: u64,
}

impl From<LikeDto> for LikeState {
    fn from(value: LikeDto) -> Self {
        Self {
            is_liked: value.is_liked,
            like_count: value.like_count,
        }
    }
}

impl ReplyDto {
    /// Converts the wire record into a checked [`Reply`].
    ///
    /// Records without a topic id inherit `topic`; records naming a different
    /// topic are rejected.
    pub fn into_reply(self, topic: &TopicId) -> Result<Reply, ApiError> {
        let id = parse_id::<ReplyId>(&self.id, "reply id")?;
        let parent_id = match self.parent_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_id::<ReplyId>(raw, "parent id")?),
        };
        let topic_id = match self.topic_id.as_deref() {
            Some(raw) => parse_id::<TopicId>(raw, "topic id")?,
            None => topic.clone(),
        };
        if topic_id != *topic {
            return Err(ApiError::InvalidResponse(format!(
                "reply {id} belongs to topic {topic_id}, expected {topic}"
            )));
        }
        let author_raw = self
            .author_id
            .clone()
            .or_else(|| self.author.as_ref().and_then(|author| author.id.clone()))
            .ok_or_else(|| ApiError::InvalidResponse(format!("reply {id} has no author")))?;
        let author_id = parse_id::<UserId>(&author_raw, "author id")?;
        let author = author_summary(self.author, &author_id);
        let created_at = parse_timestamp(&self.created_at)?;
        let updated_at = match self.updated_at.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => created_at,
        };
        let mut children = Vec::new();
        for child in self.children.unwrap_or_default() {
            children.push(std::sync::Arc::new(child.into_reply(topic)?));
        }
        Ok(Reply {
            id,
            parent_id,
            topic_id,
            author_id,
            author,
            content: self.content,
            created_at,
            updated_at,
            children,
        })
    }
}

fn author_summary(author: Option<AuthorDto>, author_id: &UserId) -> AuthorSummary {
    let Some(author) = author else {
        return AuthorSummary {
            display_name: author_id.to_string(),
            avatar_url: None,
        };
    };
    let display_name = author
        .display_name
        .or(author.username)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| author_id.to_string());
    AuthorSummary {
        display_name,
        avatar_url: author.avatar_url.filter(|url| !url.trim().is_empty()),
    }
}

fn parse_id<T>(raw: &str, field: &'static str) -> Result<T, ApiError>
where
    T: for<'a> TryFrom<&'a str, Error = replytree_core::error::CoreError>,
{
    T::try_from(raw).map_err(|err| ApiError::InvalidResponse(format!("{field}: {err}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| ApiError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{ApiError, RepliesEnvelope, ReplyDto};
    use replytree_core::types::ids::TopicId;

    fn topic() -> TopicId {
        TopicId::try_from("t1").unwrap()
    }

    #[test]
    fn parses_flat_reply() {
        let raw = r#"{
            "id": "r1",
            "parentId": null,
            "topicId": "t1",
            "authorId": "u1",
            "author": { "displayName": "Alice", "avatar": "https://cdn/a.png" },
            "content": "hello",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:05:00+00:00"
        }"#;
        let dto: ReplyDto = serde_json::from_str(raw).unwrap();
        let reply = dto.into_reply(&topic()).unwrap();
        assert_eq!(reply.id.as_str(), "r1");
        assert_eq!(reply.parent_id, None);
        assert_eq!(reply.author.display_name, "Alice");
        assert_eq!(reply.author.avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(
            reply.updated_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap()
        );
        assert!(reply.is_edited());
    }

    #[test]
    fn author_falls_back_to_nested_id_and_username() {
        let raw = r#"{
            "id": "r1",
            "author": { "id": "u9", "username": "bob" },
            "content": "hi",
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let dto: ReplyDto = serde_json::from_str(raw).unwrap();
        let reply = dto.into_reply(&topic()).unwrap();
        assert_eq!(reply.author_id.as_str(), "u9");
        assert_eq!(reply.author.display_name, "bob");
        assert_eq!(reply.updated_at, reply.created_at);
    }

    #[test]
    fn empty_parent_id_means_top_level() {
        let raw = r#"{ "id": "r1", "parentId": "", "authorId": "u1", "content": "x", "createdAt": "2024-01-01T00:00:00Z" }"#;
        let dto: ReplyDto = serde_json::from_str(raw).unwrap();
        assert_eq!(dto.into_reply(&topic()).unwrap().parent_id, None);
    }

    #[test]
    fn nested_children_are_parsed() {
        let raw = r#"{ "replies": [{
            "id": "r1", "authorId": "u1", "content": "x", "createdAt": "2024-01-01T00:00:00Z",
            "children": [{ "id": "r2", "parentId": "r1", "authorId": "u2", "content": "y", "createdAt": "2024-01-01T00:01:00Z" }]
        }] }"#;
        let envelope: RepliesEnvelope = serde_json::from_str(raw).unwrap();
        let reply = envelope
            .replies
            .into_iter()
            .next()
            .unwrap()
            .into_reply(&topic())
            .unwrap();
        assert_eq!(reply.children.len(), 1);
        assert_eq!(reply.children[0].id.as_str(), "r2");
    }

    #[test]
    fn rejects_foreign_topic_and_bad_timestamp() {
        let foreign = r#"{ "id": "r1", "topicId": "t2", "authorId": "u1", "content": "x", "createdAt": "2024-01-01T00:00:00Z" }"#;
        let dto: ReplyDto = serde_json::from_str(foreign).unwrap();
        assert!(matches!(
            dto.into_reply(&topic()),
            Err(ApiError::InvalidResponse(_))
        ));

        let bad_time = r#"{ "id": "r1", "authorId": "u1", "content": "x", "createdAt": "yesterday" }"#;
        let dto: ReplyDto = serde_json::from_str(bad_time).unwrap();
        assert!(matches!(
            dto.into_reply(&topic()),
            Err(ApiError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn rejects_missing_author() {
        let raw = r#"{ "id": "r1", "content": "x", "createdAt": "2024-01-01T00:00:00Z" }"#;
        let dto: ReplyDto = serde_json::from_str(raw).unwrap();
        assert!(dto.into_reply(&topic()).is_err());
    }
}
