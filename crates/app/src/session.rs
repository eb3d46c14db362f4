use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::likes::LikeCache;
use replytree_core::domain::reply::{Forest, Reply};
use replytree_core::tree::{
    build_tree, delete_node, descendant_count, find_with_level, insert_child, insert_root,
    reply_count, update_node,
};
use replytree_core::types::ids::{ReplyId, TopicId};
use replytree_core::validate::{ValidationError, validate_content, validate_edit};
use replytree_core::view::{ReplyView, ViewOptions, build_view};
use replytree_infra::{ApiError, LikeState, ReplyApi};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("reply {0} not found")]
    NotFound(ReplyId),
    #[error("reply {0} is not owned by the current user")]
    Forbidden(ReplyId),
    #[error("reply {0} is nested too deeply to reply to")]
    DepthLimit(ReplyId),
    #[error("another action on {0} is in flight")]
    Busy(String),
    #[error("delete of {0} was not confirmed")]
    NotConfirmed(ReplyId),
    #[error("session is closed")]
    Closed,
}

/// Result of an action whose API call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The session was refreshed or closed, or the reply was deleted, while
    /// the call was in flight; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeAction {
    Edit,
    Delete,
    Reply,
}

/// Per-reply form state: drafts, pending confirmation and the last error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    pub in_flight: Option<NodeAction>,
    pub edit_draft: Option<String>,
    pub reply_draft: Option<String>,
    pub confirming_delete: bool,
    pub error: Option<String>,
}

impl NodeState {
    fn begin(&mut self, action: NodeAction, key: &str) -> Result<(), ActionError> {
        if self.in_flight.is_some() {
            return Err(ActionError::Busy(key.to_string()));
        }
        self.in_flight = Some(action);
        self.error = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeletePrompt {
    pub id: ReplyId,
    pub descendants: usize,
}

impl DeletePrompt {
    pub fn warning(&self) -> Option<String> {
        match self.descendants {
            0 => None,
            1 => Some("1 nested reply will also be deleted".to_string()),
            count => Some(format!("{count} nested replies will also be deleted")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadSnapshot {
    pub topic_id: TopicId,
    pub total: usize,
    pub replies: Vec<ReplyView>,
    pub likes: BTreeMap<ReplyId, LikeState>,
}

#[derive(Default)]
struct SessionState {
    forest: Forest,
    generation: u64,
    closed: bool,
    nodes: HashMap<ReplyId, NodeState>,
    root: NodeState,
    collapsed: HashSet<ReplyId>,
    likes: LikeCache,
}

impl SessionState {
    fn ensure_open(&self) -> Result<(), ActionError> {
        if self.closed {
            return Err(ActionError::Closed);
        }
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.closed && self.generation == generation
    }

    fn replace_forest(&mut self, forest: Forest) {
        self.forest = forest;
        self.generation += 1;
        self.nodes.clear();
        self.root = NodeState::default();
        self.collapsed.clear();
        self.likes.clear();
    }
}

/// Reply tree of one topic together with the actions a viewer can take on it.
///
/// Clones share state. Actions on different replies may run concurrently;
/// the tree is only changed after the backend accepted the change.
#[derive(Clone)]
pub struct ThreadSession {
    api: Arc<dyn ReplyApi>,
    topic: TopicId,
    options: ViewOptions,
    state: Arc<Mutex<SessionState>>,
}

impl ThreadSession {
    pub async fn open(
        api: Arc<dyn ReplyApi>,
        topic: TopicId,
        options: ViewOptions,
    ) -> Result<Self, ActionError> {
        let records = api.fetch_replies(&topic).await?;
        let forest = build_tree(records);
        info!(topic = %topic, total = reply_count(&forest), "thread loaded");
        let mut state = SessionState::default();
        state.replace_forest(forest);
        Ok(Self {
            api,
            topic,
            options,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Fetches the replies again, discarding local form state and any result
    /// still in flight.
    pub async fn refresh(&self) -> Result<Outcome, ActionError> {
        let generation = {
            let state = self.state.lock().await;
            state.ensure_open()?;
            state.generation
        };
        let records = self.api.fetch_replies(&self.topic).await?;
        let forest = build_tree(records);
        let mut state = self.state.lock().await;
        if !state.is_current(generation) {
            return Ok(Outcome::Stale);
        }
        info!(topic = %self.topic, total = reply_count(&forest), "thread refreshed");
        state.replace_forest(forest);
        Ok(Outcome::Applied)
    }

    /// Detaches the session; results arriving afterwards are ignored.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.generation += 1;
    }

    pub async fn forest(&self) -> Forest {
        self.state.lock().await.forest.clone()
    }

    pub async fn node_state(&self, id: &ReplyId) -> NodeState {
        let state = self.state.lock().await;
        state.nodes.get(id).cloned().unwrap_or_default()
    }

    pub async fn root_state(&self) -> NodeState {
        self.state.lock().await.root.clone()
    }

    pub async fn like_state(&self, id: &ReplyId) -> LikeState {
        self.state.lock().await.likes.get(id)
    }

    pub async fn snapshot(&self) -> ThreadSnapshot {
        let state = self.state.lock().await;
        ThreadSnapshot {
            topic_id: self.topic.clone(),
            total: reply_count(&state.forest),
            replies: build_view(&state.forest, &self.options, &state.collapsed),
            likes: state.likes.snapshot(),
        }
    }

    /// Shows or hides the children of `id`. Returns whether they are now
    /// visible.
    pub async fn toggle_children(&self, id: &ReplyId) -> Result<bool, ActionError> {
        let mut state = self.state.lock().await;
        if find_with_level(&state.forest, id).is_none() {
            return Err(ActionError::NotFound(id.clone()));
        }
        if state.collapsed.remove(id) {
            return Ok(true);
        }
        state.collapsed.insert(id.clone());
        Ok(false)
    }

    pub async fn edit(&self, id: &ReplyId, content: &str) -> Result<Outcome, ActionError> {
        let (generation, content) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.ensure_open()?;
            let (node, _) =
                find_with_level(&state.forest, id).ok_or_else(|| ActionError::NotFound(id.clone()))?;
            if !self.options.can_modify(node) {
                return Err(ActionError::Forbidden(id.clone()));
            }
            let node_state = state.nodes.entry(id.clone()).or_default();
            let content = match validate_edit(&node.content, content) {
                Ok(content) => content,
                Err(err) => {
                    node_state.edit_draft = Some(content.to_string());
                    node_state.error = Some(err.to_string());
                    return Err(err.into());
                }
            };
            node_state.begin(NodeAction::Edit, id.as_str())?;
            node_state.edit_draft = Some(content.clone());
            (state.generation, content)
        };

        let result = self.api.update_reply(id, &content).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.is_current(generation) {
            debug!(reply_id = %id, "dropping stale edit result");
            return Ok(Outcome::Stale);
        }
        let Some(node_state) = state.nodes.get_mut(id) else {
            debug!(reply_id = %id, "reply deleted while edit was in flight");
            return Ok(Outcome::Stale);
        };
        node_state.in_flight = None;
        match result {
            Ok(updated) => {
                node_state.edit_draft = None;
                state.forest = update_node(&state.forest, id, &updated.content, updated.updated_at);
                info!(reply_id = %id, "reply updated");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(error = %err, reply_id = %id, "reply update failed");
                node_state.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Opens the delete confirmation for `id`, reporting how many nested
    /// replies would go with it.
    pub async fn request_delete(&self, id: &ReplyId) -> Result<DeletePrompt, ActionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.ensure_open()?;
        let (node, _) =
            find_with_level(&state.forest, id).ok_or_else(|| ActionError::NotFound(id.clone()))?;
        if !self.options.can_modify(node) {
            return Err(ActionError::Forbidden(id.clone()));
        }
        let descendants = descendant_count(node);
        state.nodes.entry(id.clone()).or_default().confirming_delete = true;
        Ok(DeletePrompt {
            id: id.clone(),
            descendants,
        })
    }

    pub async fn cancel_delete(&self, id: &ReplyId) {
        let mut state = self.state.lock().await;
        if let Some(node_state) = state.nodes.get_mut(id) {
            node_state.confirming_delete = false;
        }
    }

    pub async fn confirm_delete(&self, id: &ReplyId) -> Result<Outcome, ActionError> {
        let generation = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.ensure_open()?;
            let (node, _) =
                find_with_level(&state.forest, id).ok_or_else(|| ActionError::NotFound(id.clone()))?;
            if !self.options.can_modify(node) {
                return Err(ActionError::Forbidden(id.clone()));
            }
            let node_state = state.nodes.entry(id.clone()).or_default();
            if !node_state.confirming_delete {
                return Err(ActionError::NotConfirmed(id.clone()));
            }
            node_state.begin(NodeAction::Delete, id.as_str())?;
            state.generation
        };

        let result = self.api.delete_reply(id).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.is_current(generation) {
            debug!(reply_id = %id, "dropping stale delete result");
            return Ok(Outcome::Stale);
        }
        match result {
            Ok(()) => {
                let mut removed = Vec::new();
                if let Some((node, _)) = find_with_level(&state.forest, id) {
                    collect_ids(node, &mut removed);
                }
                for removed_id in &removed {
                    state.nodes.remove(removed_id);
                    state.collapsed.remove(removed_id);
                    state.likes.forget(removed_id);
                }
                state.forest = delete_node(&state.forest, id);
                info!(reply_id = %id, removed = removed.len(), "reply deleted");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(error = %err, reply_id = %id, "reply delete failed");
                if let Some(node_state) = state.nodes.get_mut(id) {
                    node_state.in_flight = None;
                    node_state.confirming_delete = false;
                    node_state.error = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }

    /// Posts a nested reply under `parent`.
    pub async fn reply_to(&self, parent: &ReplyId, content: &str) -> Result<Outcome, ActionError> {
        let (generation, content) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.ensure_open()?;
            let (_, level) = find_with_level(&state.forest, parent)
                .ok_or_else(|| ActionError::NotFound(parent.clone()))?;
            if !self.options.can_reply_at(level) {
                return Err(ActionError::DepthLimit(parent.clone()));
            }
            let node_state = state.nodes.entry(parent.clone()).or_default();
            let content = match validate_content(content) {
                Ok(content) => content,
                Err(err) => {
                    node_state.reply_draft = Some(content.to_string());
                    node_state.error = Some(err.to_string());
                    return Err(err.into());
                }
            };
            node_state.begin(NodeAction::Reply, parent.as_str())?;
            node_state.reply_draft = Some(content.clone());
            (state.generation, content)
        };

        let result = self
            .api
            .create_reply(&self.topic, &content, Some(parent))
            .await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.is_current(generation) {
            debug!(reply_id = %parent, "dropping stale reply result");
            return Ok(Outcome::Stale);
        }
        let Some(node_state) = state.nodes.get_mut(parent) else {
            debug!(reply_id = %parent, "parent deleted while reply was in flight");
            return Ok(Outcome::Stale);
        };
        node_state.in_flight = None;
        match result {
            Ok(created) => {
                node_state.reply_draft = None;
                let created_id = created.id.clone();
                state.forest = insert_child(&state.forest, parent, created);
                info!(reply_id = %created_id, parent_id = %parent, "nested reply created");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(error = %err, parent_id = %parent, "nested reply failed");
                node_state.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Posts a new top-level reply to the topic.
    pub async fn create_reply(&self, content: &str) -> Result<Outcome, ActionError> {
        let (generation, content) = {
            let mut state = self.state.lock().await;
            state.ensure_open()?;
            let content = match validate_content(content) {
                Ok(content) => content,
                Err(err) => {
                    state.root.reply_draft = Some(content.to_string());
                    state.root.error = Some(err.to_string());
                    return Err(err.into());
                }
            };
            state.root.begin(NodeAction::Reply, self.topic.as_str())?;
            state.root.reply_draft = Some(content.clone());
            (state.generation, content)
        };

        let result = self.api.create_reply(&self.topic, &content, None).await;

        let mut state = self.state.lock().await;
        if !state.is_current(generation) {
            debug!(topic = %self.topic, "dropping stale create result");
            return Ok(Outcome::Stale);
        }
        state.root.in_flight = None;
        match result {
            Ok(created) => {
                state.root.reply_draft = None;
                let created_id = created.id.clone();
                state.forest = insert_root(&state.forest, created);
                info!(reply_id = %created_id, topic = %self.topic, "reply created");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(error = %err, topic = %self.topic, "reply create failed");
                state.root.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn toggle_like(&self, id: &ReplyId) -> Result<Outcome, ActionError> {
        let generation = {
            let mut state = self.state.lock().await;
            state.ensure_open()?;
            if find_with_level(&state.forest, id).is_none() {
                return Err(ActionError::NotFound(id.clone()));
            }
            if !state.likes.begin(id) {
                return Err(ActionError::Busy(id.to_string()));
            }
            state.generation
        };

        let result = self.api.toggle_like(id).await;

        let mut state = self.state.lock().await;
        if !state.is_current(generation) {
            debug!(reply_id = %id, "dropping stale like result");
            return Ok(Outcome::Stale);
        }
        if find_with_level(&state.forest, id).is_none() {
            debug!(reply_id = %id, "reply deleted while like was in flight");
            state.likes.forget(id);
            return Ok(Outcome::Stale);
        }
        match result {
            Ok(like) => {
                state.likes.finish(id, Some(like));
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(error = %err, reply_id = %id, "like toggle failed");
                state.likes.finish(id, None);
                state.nodes.entry(id.clone()).or_default().error = Some(err.to_string());
                Err(err.into())
            }
        }
    }
}

fn collect_ids(node: &Reply, out: &mut Vec<ReplyId>) {
    out.push(node.id.clone());
    for child in &node.children {
        collect_ids(child, out);
    }
}
