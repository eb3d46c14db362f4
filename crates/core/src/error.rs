use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {0} id: {1}")]
    InvalidId(&'static str, String),
}
