//! The ordered log of messages shown to the user.

use std::fmt::{self, Debug};
use std::sync::Arc;

use tokio::sync::watch;
use weather_chat_transport::ChatTurn;

use crate::message::{Message, MessageId, Mutation};

/// The messages of one conversation, in chronological order.
///
/// This is a cheap handle; clones share the same log. The log can only
/// grow by [`append`](Self::append) and change in place by
/// [`update`](Self::update), so a writer can never clobber an entry it
/// doesn't target.
#[derive(Clone)]
pub struct ConversationStore {
    messages: Arc<watch::Sender<Vec<Message>>>,
}

impl ConversationStore {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            messages: Arc::new(messages),
        }
    }

    /// Appends a message at the end and returns its id.
    pub fn append(&self, message: Message) -> MessageId {
        let id = message.id();
        trace!("append {id} ({:?})", message.role());
        self.messages.send_modify(|messages| messages.push(message));
        id
    }

    /// Applies `mutation` to the message with the given id.
    ///
    /// Returns `false` if there is no such message (it may have been
    /// cleared) or the mutation didn't change anything.
    pub fn update(&self, id: MessageId, mutation: Mutation) -> bool {
        self.messages.send_if_modified(|messages| {
            // The message being written to is almost always the last one.
            let Some(message) =
                messages.iter_mut().rev().find(|m| m.id() == id)
            else {
                debug!("{id} is gone, dropping {mutation:?}");
                return false;
            };
            message.apply(mutation)
        })
    }

    /// Returns a copy of the message with the given id.
    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.messages.borrow().iter().find(|m| m.id() == id).cloned()
    }

    /// Returns a copy of all messages, in display order.
    #[inline]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    /// Returns `true` if the conversation has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    /// Removes every message.
    pub fn clear(&self) {
        self.messages.send_if_modified(|messages| {
            let changed = !messages.is_empty();
            messages.clear();
            changed
        });
    }

    /// Subscribes to changes of the conversation.
    ///
    /// Notifications coalesce: a slow observer sees the latest state,
    /// not every intermediate one. Don't hold the receiver's borrow
    /// while calling into a session, or the two will deadlock.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.subscribe()
    }

    /// Returns the settled, successful turns to send as context.
    pub(crate) fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .borrow()
            .iter()
            .filter(|m| {
                !m.is_streaming() && !m.is_error() && !m.content().is_empty()
            })
            .map(|m| ChatTurn {
                role: m.role(),
                content: m.content().to_owned(),
            })
            .collect()
    }
}

impl Default for ConversationStore {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ConversationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationStore")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use weather_chat_transport::Role;

    use super::*;

    #[test]
    fn test_append_and_update() {
        let store = ConversationStore::new();
        let user_id = store.append(Message::user("Weather in Rome?"));
        let reply_id = store.append(Message::placeholder());

        assert!(store.update(reply_id, Mutation::AppendText("Warm".into())));
        assert!(store.update(reply_id, Mutation::MarkSettled));
        assert!(!store.update(reply_id, Mutation::MarkSettled));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id(), user_id);
        assert_eq!(snapshot[1].content(), "Warm");
        assert!(!snapshot[1].is_streaming());
        assert_eq!(store.get(user_id).unwrap().role(), Role::User);
    }

    #[test]
    fn test_update_after_clear() {
        let store = ConversationStore::new();
        let id = store.append(Message::placeholder());
        store.clear();
        assert!(store.is_empty());
        assert!(!store.update(id, Mutation::AppendText("late".into())));
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_history_skips_pending_and_errors() {
        let store = ConversationStore::new();
        store.append(Message::user("Hi"));
        let ok = store.append(Message::placeholder());
        store.update(ok, Mutation::AppendText("Hello!".into()));
        store.update(ok, Mutation::MarkSettled);
        store.append(Message::user("Rain?"));
        let failed = store.append(Message::placeholder());
        store.update(failed, Mutation::MarkError("Sorry".into()));
        store.append(Message::placeholder());

        let history = store.history();
        assert_eq!(
            history,
            vec![
                ChatTurn::user("Hi"),
                ChatTurn::assistant("Hello!"),
                ChatTurn::user("Rain?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribe() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();
        let id = store.append(Message::placeholder());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        store.update(id, Mutation::AppendText("a".into()));
        store.update(id, Mutation::AppendText("b".into()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0].content(), "ab");

        // Rejected mutations don't wake observers.
        store.update(id, Mutation::MarkSettled);
        rx.changed().await.unwrap();
        store.update(id, Mutation::AppendText("c".into()));
        assert!(!rx.has_changed().unwrap());
    }
}
