use std::sync::Arc;

use crate::config::AppConfig;
use replytree_infra::ReplyApi;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn ReplyApi>,
}
