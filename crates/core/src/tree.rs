use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::reply::{Forest, Reply};
use crate::types::ids::ReplyId;

/// Deepest nesting level `build_tree` produces; replies below it are
/// promoted to top-level.
pub const MAX_DEPTH: usize = 256;

/// Links a batch of replies into a forest using their `parent_id`.
///
/// A batch that already carries nested children is returned as is. Replies
/// whose parent is missing from the batch, or is the reply itself, become
/// top-level. Replies that would sit at level [`MAX_DEPTH`] or deeper, and
/// replies caught in a parent cycle, are promoted to top-level after all
/// regular roots; for a cycle the closing edge is dropped. A promoted reply
/// keeps its `parent_id`.
pub fn build_tree(records: Vec<Reply>) -> Forest {
    if records.iter().any(|record| !record.children.is_empty()) {
        return records.into_iter().map(Arc::new).collect();
    }

    let mut index = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        index.insert(record.id.clone(), idx);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if let Some(parent_id) = record.parent_id.as_ref() {
            if let Some(&parent_idx) = index.get(parent_id) {
                if parent_idx != idx && *parent_id != record.id {
                    children[parent_idx].push(idx);
                    continue;
                }
            }
        }
        roots.push(idx);
    }

    let mut builder = Builder {
        slots: records.into_iter().map(Some).collect(),
        children,
        deferred: Vec::new(),
        next_deferred: 0,
        forest: Vec::with_capacity(roots.len()),
    };
    for idx in roots {
        builder.root(idx);
    }
    builder.drain_deferred();
    // Anything left is only reachable through a cycle.
    for idx in 0..builder.slots.len() {
        builder.root(idx);
        builder.drain_deferred();
    }
    builder.forest
}

struct Builder {
    slots: Vec<Option<Reply>>,
    children: Vec<Vec<usize>>,
    deferred: Vec<usize>,
    next_deferred: usize,
    forest: Forest,
}

impl Builder {
    fn root(&mut self, idx: usize) {
        if let Some(node) = self.materialize(idx) {
            self.forest.push(node);
        }
    }

    fn drain_deferred(&mut self) {
        while let Some(&idx) = self.deferred.get(self.next_deferred) {
            self.next_deferred += 1;
            self.root(idx);
        }
    }

    /// Builds the subtree under `idx` post-order with an explicit stack.
    fn materialize(&mut self, idx: usize) -> Option<Arc<Reply>> {
        let reply = self.slots[idx].take()?;
        let mut stack: Vec<(usize, Reply, usize)> = vec![(idx, reply, 0)];
        while let Some((idx, _, cursor)) = stack.last_mut() {
            if let Some(&child_idx) = self.children[*idx].get(*cursor) {
                *cursor += 1;
                if stack.len() >= MAX_DEPTH {
                    self.deferred.push(child_idx);
                } else if let Some(child) = self.slots[child_idx].take() {
                    stack.push((child_idx, child, 0));
                }
                continue;
            }
            let (_, reply, _) = stack.pop()?;
            let node = Arc::new(reply);
            match stack.last_mut() {
                Some((_, parent, _)) => parent.children.push(node),
                None => return Some(node),
            }
        }
        None
    }
}

/// Replaces the content of `target`, stamping `updated_at` with `now`.
///
/// Only the target and its ancestors are copied; every other subtree is
/// shared with `forest`.
pub fn update_node(
    forest: &[Arc<Reply>],
    target: &ReplyId,
    content: &str,
    now: DateTime<Utc>,
) -> Forest {
    let mut edit = |node: &Reply| -> Option<Reply> {
        let mut updated = node.with_children(node.children.clone());
        updated.content = content.to_string();
        updated.updated_at = now;
        Some(updated)
    };
    rewrite(forest, target, &mut edit).unwrap_or_else(|| forest.to_vec())
}

/// Removes `target` together with its whole subtree.
pub fn delete_node(forest: &[Arc<Reply>], target: &ReplyId) -> Forest {
    let mut remove = |_: &Reply| -> Option<Reply> { None };
    rewrite(forest, target, &mut remove).unwrap_or_else(|| forest.to_vec())
}

/// Appends `child` as the last reply under `parent`.
pub fn insert_child(forest: &[Arc<Reply>], parent: &ReplyId, child: Reply) -> Forest {
    let mut pending = Some(detach(child, Some(parent.clone())));
    let mut append = |node: &Reply| -> Option<Reply> {
        let mut children = node.children.clone();
        if let Some(child) = pending.take() {
            children.push(Arc::new(child));
        }
        Some(node.with_children(children))
    };
    rewrite(forest, parent, &mut append).unwrap_or_else(|| forest.to_vec())
}

/// Appends `reply` as the last top-level reply.
pub fn insert_root(forest: &[Arc<Reply>], reply: Reply) -> Forest {
    let mut next = forest.to_vec();
    next.push(Arc::new(detach(reply, None)));
    next
}

fn detach(mut reply: Reply, parent_id: Option<ReplyId>) -> Reply {
    reply.parent_id = parent_id;
    reply.children = Vec::new();
    reply
}

/// Applies `apply` to the first node matching `target` in pre-order.
///
/// Returns `None` when nothing matched. `apply` returning `None` removes the
/// node.
fn rewrite<F>(nodes: &[Arc<Reply>], target: &ReplyId, apply: &mut F) -> Option<Forest>
where
    F: FnMut(&Reply) -> Option<Reply>,
{
    for (pos, node) in nodes.iter().enumerate() {
        if node.id == *target {
            let mut next = nodes.to_vec();
            match apply(node) {
                Some(updated) => next[pos] = Arc::new(updated),
                None => {
                    next.remove(pos);
                }
            }
            return Some(next);
        }
        if let Some(children) = rewrite(&node.children, target, apply) {
            let mut next = nodes.to_vec();
            next[pos] = Arc::new(node.with_children(children));
            return Some(next);
        }
    }
    None
}

pub fn find_node<'a>(forest: &'a [Arc<Reply>], target: &ReplyId) -> Option<&'a Arc<Reply>> {
    find_with_level(forest, target).map(|(node, _)| node)
}

/// Looks up `target` and reports its nesting level (0 for top-level).
pub fn find_with_level<'a>(
    forest: &'a [Arc<Reply>],
    target: &ReplyId,
) -> Option<(&'a Arc<Reply>, usize)> {
    find_at(forest, target, 0)
}

fn find_at<'a>(
    nodes: &'a [Arc<Reply>],
    target: &ReplyId,
    level: usize,
) -> Option<(&'a Arc<Reply>, usize)> {
    for node in nodes {
        if node.id == *target {
            return Some((node, level));
        }
        if let Some(found) = find_at(&node.children, target, level + 1) {
            return Some(found);
        }
    }
    None
}

pub fn descendant_count(node: &Reply) -> usize {
    node.children
        .iter()
        .map(|child| 1 + descendant_count(child))
        .sum()
}

pub fn reply_count(forest: &[Arc<Reply>]) -> usize {
    forest.iter().map(|node| 1 + descendant_count(node)).sum()
}
