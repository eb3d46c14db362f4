use chrono::{TimeZone, Utc};

use crate::domain::reply::{AuthorSummary, Reply};
use crate::types::ids::{ReplyId, TopicId, UserId};

pub fn id(value: &str) -> ReplyId {
    ReplyId::try_from(value).unwrap()
}

pub fn user(value: &str) -> UserId {
    UserId::try_from(value).unwrap()
}

pub fn reply(reply_id: &str, parent: Option<&str>, author: &str) -> Reply {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Reply {
        id: id(reply_id),
        parent_id: parent.map(id),
        topic_id: TopicId::try_from("t1").unwrap(),
        author_id: user(author),
        author: AuthorSummary {
            display_name: author.to_string(),
            avatar_url: None,
        },
        content: format!("content of {reply_id}"),
        created_at: created,
        updated_at: created,
        children: Vec::new(),
    }
}
