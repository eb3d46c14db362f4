use thiserror::Error;
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::config::{ConfigError, parse_user_id};
use crate::render::render_thread;
use crate::session::{ActionError, NodeState, Outcome, ThreadSession};
use crate::state::AppState;
use replytree_core::error::CoreError;
use replytree_core::types::ids::{ReplyId, TopicId};
use replytree_core::view::ViewOptions;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid id: {0}")]
    InvalidId(#[from] CoreError),
    #[error("invalid user: {0}")]
    InvalidUser(#[from] ConfigError),
    #[error("{0}")]
    Action(#[from] ActionError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("delete of {0} needs --yes")]
    Unconfirmed(ReplyId),
}

pub async fn run(state: &AppState, cli: Cli) -> Result<(), CommandError> {
    let topic = TopicId::try_from(cli.topic.as_str())?;
    let viewer = match cli.as_user.as_deref() {
        Some(raw) => Some(parse_user_id("--as-user", raw)?),
        None => state.config.user_id.clone(),
    };
    let options = ViewOptions {
        viewer,
        max_level: state.config.max_level,
    };
    let session = ThreadSession::open(state.api.clone(), topic, options).await?;

    let result = execute(&session, cli.command).await;
    session.close().await;
    result
}

async fn execute(session: &ThreadSession, command: Command) -> Result<(), CommandError> {
    match command {
        Command::Show { json, collapse } => {
            for raw in collapse {
                session.toggle_children(&ReplyId::try_from(raw)?).await?;
            }
            let snapshot = session.snapshot().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", render_thread(&snapshot));
            }
            return Ok(());
        }
        Command::Reply { parent, content } => {
            let outcome = match parent {
                Some(raw) => {
                    let parent = ReplyId::try_from(raw)?;
                    let result = session.reply_to(&parent, &content).await;
                    if result.is_err() {
                        let form = session.node_state(&parent).await;
                        log_failed_form("reply", &form);
                    }
                    result?
                }
                None => {
                    let result = session.create_reply(&content).await;
                    if result.is_err() {
                        log_failed_form("reply", &session.root_state().await);
                    }
                    result?
                }
            };
            report("reply", outcome);
        }
        Command::Edit { id, content } => {
            let id = ReplyId::try_from(id)?;
            let result = session.edit(&id, &content).await;
            if result.is_err() {
                log_failed_form("edit", &session.node_state(&id).await);
            }
            report("edit", result?);
        }
        Command::Delete { id, yes } => {
            let id = ReplyId::try_from(id)?;
            let prompt = session.request_delete(&id).await?;
            if let Some(warning) = prompt.warning() {
                println!("warning: {warning}");
            }
            if !yes {
                session.cancel_delete(&id).await;
                return Err(CommandError::Unconfirmed(id));
            }
            let outcome = session.confirm_delete(&id).await?;
            report("delete", outcome);
        }
        Command::Like { id } => {
            let id = ReplyId::try_from(id)?;
            let outcome = session.toggle_like(&id).await?;
            let like = session.like_state(&id).await;
            info!(reply_id = %id, liked = like.is_liked, count = like.like_count, "like toggled");
            report("like", outcome);
        }
    }
    print!("{}", render_thread(&session.snapshot().await));
    Ok(())
}

fn log_failed_form(action: &'static str, form: &NodeState) {
    let draft = form.edit_draft.as_deref().or(form.reply_draft.as_deref());
    warn!(
        action,
        draft = draft.unwrap_or_default(),
        error = form.error.as_deref().unwrap_or_default(),
        "action failed; draft kept"
    );
}

fn report(action: &'static str, outcome: Outcome) {
    match outcome {
        Outcome::Applied => info!(action, "action applied"),
        Outcome::Stale => info!(action, "action result discarded"),
    }
}
