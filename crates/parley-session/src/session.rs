//! A single conversation log.

use chrono::{DateTime, Utc};
use parley_core::{AppId, Message, SessionId, SessionKey, UserId};
use serde::Serialize;

/// Ordered message history for one session key.
///
/// The only mutation is [`push`](Session::push), which is crate-private;
/// callers append through the store or a [`SessionGuard`](crate::SessionGuard).
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    key: SessionKey,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(key: SessionKey) -> Self {
        Self {
            key,
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn app_id(&self) -> &AppId {
        &self.key.app_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.key.user_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.key.session_id
    }

    /// Messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let key = SessionKey::parse("app", "user", "s1").unwrap();
        let mut session = Session::new(key.clone());
        assert!(session.is_empty());

        session.push(Message::user("one"));
        session.push(Message::user("two"));

        let texts: Vec<&str> = session.messages().iter().map(Message::text).collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(session.last().map(Message::text), Some("two"));
        assert_eq!(session.key(), &key);
        assert_eq!(session.user_id().as_str(), "user");
    }
}
