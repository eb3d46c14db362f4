pub mod api;

pub use api::{ApiError, HttpReplyApi, LikeState, ReplyApi};
