use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::ids::{ReplyId, TopicId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// A single reply attached to a topic, possibly nested under another reply.
///
/// `children` is empty for records straight off the wire unless the backend
/// already returned a nested batch; see [`crate::tree::build_tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub id: ReplyId,
    pub parent_id: Option<ReplyId>,
    pub topic_id: TopicId,
    pub author_id: UserId,
    pub author: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub children: Vec<Arc<Reply>>,
}

/// Top-level replies, each owning its nested subtree.
pub type Forest = Vec<Arc<Reply>>;

impl Reply {
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }

    pub fn is_authored_by(&self, user: &UserId) -> bool {
        self.author_id == *user
    }

    pub(crate) fn with_children(&self, children: Vec<Arc<Reply>>) -> Reply {
        Reply {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            topic_id: self.topic_id.clone(),
            author_id: self.author_id.clone(),
            author: self.author.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{AuthorSummary, Reply};
    use crate::types::ids::{ReplyId, TopicId, UserId};

    fn reply() -> Reply {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Reply {
            id: ReplyId::try_from("r1").unwrap(),
            parent_id: None,
            topic_id: TopicId::try_from("t1").unwrap(),
            author_id: UserId::try_from("u1").unwrap(),
            author: AuthorSummary {
                display_name: "alice".to_string(),
                avatar_url: None,
            },
            content: "hello".to_string(),
            created_at: created,
            updated_at: created,
            children: Vec::new(),
        }
    }

    #[test]
    fn equal_timestamps_mean_not_edited() {
        let mut record = reply();
        assert!(!record.is_edited());
        record.updated_at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(record.is_edited());
    }

    #[test]
    fn authorship_compares_user_ids() {
        let record = reply();
        assert!(record.is_authored_by(&UserId::try_from("u1").unwrap()));
        assert!(!record.is_authored_by(&UserId::try_from("u2").unwrap()));
    }
}
