//! Reply context: what the text model sees and how much room it gets

use crate::transport::{DirectMessage, Post};
use once_cell::sync::Lazy;
use regex::Regex;

/// `@handle` not preceded by a word character, so e-mail addresses are left alone
static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w@])@(\w+)").expect("static regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    /// Source text with every @handle removed
    pub mentionless: String,
    /// `@handle ` prefix addressing everyone in the conversation but us
    pub prefix: String,
    /// Characters left for the composed response
    pub limit: usize,
}

impl ReplyContext {
    /// Context for a public reply to `post`, sent as `own_handle`
    pub fn for_post(post: &Post, own_handle: &str, max_length: usize) -> Self {
        let mut participants: Vec<&str> = Vec::new();
        let mentioned = MENTION
            .captures_iter(&post.text)
            .filter_map(|c| c.get(2).map(|m| m.as_str()));

        for handle in std::iter::once(post.author.as_str()).chain(mentioned) {
            let seen = participants.iter().any(|p| p.eq_ignore_ascii_case(handle));
            if !seen && !handle.eq_ignore_ascii_case(own_handle) {
                participants.push(handle);
            }
        }

        let prefix: String = participants.iter().map(|h| format!("@{} ", h)).collect();
        let limit = max_length.saturating_sub(prefix.chars().count());

        Self {
            mentionless: strip_mentions(&post.text),
            prefix,
            limit,
        }
    }

    /// Context for a private reply; no prefix is needed
    pub fn for_direct_message(dm: &DirectMessage, max_length: usize) -> Self {
        Self {
            mentionless: dm.text.trim().to_string(),
            prefix: String::new(),
            limit: max_length,
        }
    }

    /// Final reply text for a composed response
    pub fn render(&self, response: &str) -> String {
        format!("{}{}", self.prefix, response)
    }
}

/// Remove @handles and collapse the leftover whitespace
pub fn strip_mentions(text: &str) -> String {
    MENTION
        .replace_all(text, "${1}")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_own_handle_from_context() {
        let post = Post::new("1", "alice", "@clone_ebooks what do you think about rust?");
        let ctx = ReplyContext::for_post(&post, "clone_ebooks", 280);

        assert_eq!(ctx.mentionless, "what do you think about rust?");
        assert_eq!(ctx.prefix, "@alice ");
        assert_eq!(ctx.limit, 280 - 7);
    }

    #[test]
    fn test_prefix_addresses_every_participant_once() {
        let post = Post::new("2", "alice", "@Clone_Ebooks @bob @ALICE @bob hello");
        let ctx = ReplyContext::for_post(&post, "clone_ebooks", 100);

        assert_eq!(ctx.prefix, "@alice @bob ");
        assert_eq!(ctx.mentionless, "hello");
        assert_eq!(ctx.limit, 100 - 12);
    }

    #[test]
    fn test_email_addresses_are_not_mentions() {
        let post = Post::new("6", "alice", "@clone mail me@example.com (@bob) thanks");
        let ctx = ReplyContext::for_post(&post, "clone", 280);

        assert_eq!(ctx.prefix, "@alice @bob ");
        assert_eq!(ctx.mentionless, "mail me@example.com () thanks");
    }

    #[test]
    fn test_limit_never_underflows() {
        let post = Post::new("3", "a_rather_long_handle", "hi");
        let ctx = ReplyContext::for_post(&post, "bot", 5);
        assert_eq!(ctx.limit, 0);
    }

    #[test]
    fn test_render_prepends_prefix() {
        let post = Post::new("4", "alice", "@bot hi");
        let ctx = ReplyContext::for_post(&post, "bot", 280);
        assert_eq!(ctx.render("hello there"), "@alice hello there");
    }

    #[test]
    fn test_direct_message_context() {
        let dm = DirectMessage::new("5", "carol", "  tell me a story ");
        let ctx = ReplyContext::for_direct_message(&dm, 280);
        assert_eq!(ctx.mentionless, "tell me a story");
        assert!(ctx.prefix.is_empty());
        assert_eq!(ctx.limit, 280);
        assert_eq!(ctx.render("once upon a time"), "once upon a time");
    }
}
