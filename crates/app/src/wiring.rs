use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;

use crate::config::AppConfig;
use crate::state::AppState;
use replytree_infra::{ApiError, HttpReplyApi};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("api client error: {0}")]
    Api(#[from] ApiError),
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let client = Client::builder().timeout(config.request_timeout).build()?;
    let api = HttpReplyApi::new(client, &config.api_base_url, config.api_token.clone())?;
    Ok(AppState {
        config: Arc::new(config),
        api: Arc::new(api),
    })
}
