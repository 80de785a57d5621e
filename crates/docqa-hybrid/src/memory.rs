use std::collections::VecDeque;

use serde::Serialize;

use docqa_core::types::{ChatMessage, Role};

/// Sliding window over the last `max_turns` user/assistant exchanges
/// (`2 * max_turns` messages).
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    max_turns: usize,
    messages: VecDeque<ChatMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySummary {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self { Self { max_turns, messages: VecDeque::with_capacity(max_turns * 2) } }

    fn capacity(&self) -> usize { self.max_turns * 2 }

    fn push(&mut self, message: ChatMessage) {
        if self.capacity() == 0 { return; }
        if self.messages.len() == self.capacity() { self.messages.pop_front(); }
        self.messages.push_back(message);
    }

    pub fn add_user(&mut self, content: impl Into<String>) { self.push(ChatMessage::user(content)); }

    pub fn add_assistant(&mut self, content: impl Into<String>) { self.push(ChatMessage::assistant(content)); }

    pub fn history(&self) -> Vec<ChatMessage> { self.messages.iter().cloned().collect() }

    /// User messages only, oldest first. Feed this to context-aware retrieval
    /// when assistant turns are notes rather than answers.
    pub fn user_turns(&self) -> Vec<ChatMessage> { self.messages.iter().filter(|m| m.role == Role::User).cloned().collect() }

    /// Last `num_turns` exchanges as `User: ...` / `Assistant: ...` lines.
    pub fn recent_context(&self, num_turns: usize) -> String {
        let skip = self.messages.len().saturating_sub(num_turns * 2);
        self.messages
            .iter()
            .skip(skip)
            .map(|m| match m.role {
                Role::User => format!("User: {}", m.content),
                Role::Assistant => format!("Assistant: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) { self.messages.clear(); }

    pub fn summary(&self) -> MemorySummary {
        let user_messages = self.messages.iter().filter(|m| m.role == Role::User).count();
        let assistant_messages = self.messages.len() - user_messages;
        MemorySummary { total_messages: self.messages.len(), user_messages, assistant_messages, turns: user_messages.min(assistant_messages) }
    }

    /// Replace the buffer with the tail of `history` that fits.
    pub fn import(&mut self, history: &[ChatMessage]) {
        self.messages.clear();
        let skip = history.len().saturating_sub(self.capacity());
        self.messages.extend(history.iter().skip(skip).cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_last_turns() {
        let mut m = ConversationMemory::new(2);
        for i in 0..3 {
            m.add_user(format!("q{i}"));
            m.add_assistant(format!("a{i}"));
        }
        let contents: Vec<String> = m.history().into_iter().map(|msg| msg.content).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn recent_context_formats_roles() {
        let mut m = ConversationMemory::new(5);
        m.add_user("Where is stage 7?");
        m.add_assistant("Next to gate 2.");
        m.add_user("And the backlot?");
        assert_eq!(m.recent_context(1), "Assistant: Next to gate 2.\nUser: And the backlot?");
        assert_eq!(m.recent_context(3).lines().count(), 3);
    }

    #[test]
    fn summary_counts_roles_and_turns() {
        let mut m = ConversationMemory::new(5);
        m.add_user("a");
        m.add_assistant("b");
        m.add_user("c");
        assert_eq!(m.summary(), MemorySummary { total_messages: 3, user_messages: 2, assistant_messages: 1, turns: 1 });
        m.clear();
        assert_eq!(m.summary().total_messages, 0);
    }

    #[test]
    fn import_keeps_tail() {
        let mut m = ConversationMemory::new(1);
        m.import(&[ChatMessage::user("old"), ChatMessage::user("q"), ChatMessage::assistant("a")]);
        assert_eq!(m.history(), vec![ChatMessage::user("q"), ChatMessage::assistant("a")]);
    }

    #[test]
    fn user_turns_leave_out_assistant_notes() {
        let mut m = ConversationMemory::new(5);
        m.add_user("Where is stage 7?");
        m.add_assistant("Found 3 passages, top source guide.pdf");
        m.add_user("Is it open on Sundays?");
        let turns = m.user_turns();
        assert_eq!(turns, vec![ChatMessage::user("Where is stage 7?"), ChatMessage::user("Is it open on Sundays?")]);
        assert_eq!(
            crate::retriever::contextual_query("parking?", &turns),
            "Where is stage 7? Is it open on Sundays? parking?"
        );
    }

    #[test]
    fn zero_turns_keeps_nothing() {
        let mut m = ConversationMemory::new(0);
        m.add_user("x");
        assert!(m.history().is_empty());
    }
}
