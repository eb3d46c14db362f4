use std::fmt::Write;

use crate::session::ThreadSnapshot;
use replytree_core::view::ReplyView;

const INDENT: &str = "  ";

pub fn render_thread(snapshot: &ThreadSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "topic {} ({} replies)",
        snapshot.topic_id, snapshot.total
    );
    for reply in &snapshot.replies {
        render_reply(reply, snapshot, &mut out);
    }
    out
}

fn render_reply(reply: &ReplyView, snapshot: &ThreadSnapshot, out: &mut String) {
    let pad = INDENT.repeat(reply.level);
    let edited = if reply.is_edited { " (edited)" } else { "" };
    let likes = snapshot
        .likes
        .get(&reply.id)
        .map(|like| {
            let mark = if like.is_liked { "liked" } else { "likes" };
            format!(" [{mark}: {}]", like.like_count)
        })
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "{pad}- {} by {} at {}{edited}{likes}",
        reply.id,
        reply.author.display_name,
        reply.created_at.format("%Y-%m-%d %H:%M")
    );
    for line in reply.content.lines() {
        let _ = writeln!(out, "{pad}{INDENT}{line}");
    }
    let actions = actions(reply);
    if !actions.is_empty() {
        let _ = writeln!(out, "{pad}{INDENT}actions: {}", actions.join(", "));
    }
    if !reply.children_visible && reply.child_count > 0 {
        let _ = writeln!(
            out,
            "{pad}{INDENT}+ {} hidden replies",
            reply.descendant_count
        );
    }
    for child in &reply.children {
        render_reply(child, snapshot, out);
    }
}

fn actions(reply: &ReplyView) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if reply.can_reply {
        actions.push("reply");
    }
    if reply.can_edit {
        actions.push("edit");
    }
    if reply.can_delete {
        actions.push("delete");
    }
    actions
}
