use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::reply::{AuthorSummary, Reply};
use crate::tree::descendant_count;
use crate::types::ids::{ReplyId, UserId};

pub const DEFAULT_MAX_LEVEL: usize = 3;

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub viewer: Option<UserId>,
    pub max_level: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            viewer: None,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl ViewOptions {
    pub fn can_modify(&self, reply: &Reply) -> bool {
        self.viewer
            .as_ref()
            .is_some_and(|viewer| reply.is_authored_by(viewer))
    }

    pub fn can_reply_at(&self, level: usize) -> bool {
        level < self.max_level
    }
}

/// What the viewer may see and do for one reply.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    pub id: ReplyId,
    pub author_id: UserId,
    pub author: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_edited: bool,
    pub level: usize,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_reply: bool,
    pub child_count: usize,
    pub descendant_count: usize,
    pub children_visible: bool,
    pub children: Vec<ReplyView>,
}

/// Builds the view of every reply in `forest`.
///
/// Existing replies are always included regardless of depth; only the reply
/// action is cut off at `max_level`. Replies listed in `collapsed` keep their
/// counts but hide their children.
pub fn build_view(
    forest: &[Arc<Reply>],
    options: &ViewOptions,
    collapsed: &HashSet<ReplyId>,
) -> Vec<ReplyView> {
    forest
        .iter()
        .map(|reply| view_node(reply, 0, options, collapsed))
        .collect()
}

fn view_node(
    reply: &Reply,
    level: usize,
    options: &ViewOptions,
    collapsed: &HashSet<ReplyId>,
) -> ReplyView {
    let owned = options.can_modify(reply);
    let children_visible = !collapsed.contains(&reply.id);
    let (children, descendants) = if children_visible {
        let children: Vec<ReplyView> = reply
            .children
            .iter()
            .map(|child| view_node(child, level + 1, options, collapsed))
            .collect();
        let descendants = children
            .iter()
            .map(|child| 1 + child.descendant_count)
            .sum();
        (children, descendants)
    } else {
        (Vec::new(), descendant_count(reply))
    };
    ReplyView {
        id: reply.id.clone(),
        author_id: reply.author_id.clone(),
        author: reply.author.clone(),
        content: reply.content.clone(),
        created_at: reply.created_at,
        updated_at: reply.updated_at,
        is_edited: reply.is_edited(),
        level,
        can_edit: owned,
        can_delete: owned,
        can_reply: options.can_reply_at(level),
        child_count: reply.children.len(),
        descendant_count: descendants,
        children_visible,
        children,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{ReplyView, ViewOptions, build_view};
    use crate::testing::{id, reply, user};
    use crate::tree::build_tree;

    fn chain(depth: usize) -> Vec<crate::domain::reply::Reply> {
        (0..depth)
            .map(|level| {
                let name = format!("r{level}");
                let parent = (level > 0).then(|| format!("r{}", level - 1));
                reply(&name, parent.as_deref(), "u1")
            })
            .collect()
    }

    fn flatten(views: &[ReplyView], out: &mut Vec<(usize, bool)>) {
        for view in views {
            out.push((view.level, view.can_reply));
            flatten(&view.children, out);
        }
    }

    #[test]
    fn reply_action_stops_at_max_level_but_all_levels_render() {
        let forest = build_tree(chain(5));
        let options = ViewOptions {
            viewer: Some(user("u1")),
            max_level: 3,
        };
        let views = build_view(&forest, &options, &HashSet::new());
        let mut levels = Vec::new();
        flatten(&views, &mut levels);
        assert_eq!(
            levels,
            vec![(0, true), (1, true), (2, true), (3, false), (4, false)]
        );
    }

    #[test]
    fn only_author_may_edit_or_delete() {
        let forest = build_tree(vec![reply("A", None, "u1")]);
        let stranger = ViewOptions {
            viewer: Some(user("u2")),
            ..ViewOptions::default()
        };
        let view = &build_view(&forest, &stranger, &HashSet::new())[0];
        assert!(!view.can_edit);
        assert!(!view.can_delete);

        let author = ViewOptions {
            viewer: Some(user("u1")),
            ..ViewOptions::default()
        };
        let view = &build_view(&forest, &author, &HashSet::new())[0];
        assert!(view.can_edit);
        assert!(view.can_delete);
    }

    #[test]
    fn anonymous_viewer_gets_no_owner_actions() {
        let forest = build_tree(vec![reply("A", None, "u1")]);
        let view = &build_view(&forest, &ViewOptions::default(), &HashSet::new())[0];
        assert!(!view.can_edit);
        assert!(view.can_reply);
    }

    #[test]
    fn collapsed_reply_hides_children_but_keeps_counts() {
        let forest = build_tree(chain(3));
        let mut collapsed = HashSet::new();
        collapsed.insert(id("r0"));
        let views = build_view(&forest, &ViewOptions::default(), &collapsed);
        assert!(!views[0].children_visible);
        assert!(views[0].children.is_empty());
        assert_eq!(views[0].child_count, 1);
        assert_eq!(views[0].descendant_count, 2);
    }

    #[test]
    fn descendant_counts_add_up_through_collapsed_branches() {
        let forest = build_tree(vec![
            reply("A", None, "u1"),
            reply("B", Some("A"), "u1"),
            reply("C", Some("B"), "u1"),
            reply("D", Some("C"), "u1"),
            reply("E", Some("A"), "u1"),
        ]);
        let mut collapsed = HashSet::new();
        collapsed.insert(id("B"));
        let views = build_view(&forest, &ViewOptions::default(), &collapsed);
        assert_eq!(views[0].descendant_count, 4);
        assert_eq!(views[0].children[0].descendant_count, 2);
        assert!(views[0].children[0].children.is_empty());
        assert_eq!(views[0].children[1].descendant_count, 0);
    }
}
