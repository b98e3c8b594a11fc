//! Conversation inbox for one viewer.
//!
//! Messages reach the client twice over: in bulk from the REST inbox and
//! sent lists, and one at a time as gateway pushes. Both feed the same
//! reducer, which groups them into one thread per (counterparty, item),
//! keeps each thread in chronological order and never shows a message id
//! twice, whatever order the two sources deliver in.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lostfound_types::models::{ItemRef, Message, Party};

use crate::session::Identity;

/// Thread identity: who the viewer is talking to, and about which item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub counterparty: Uuid,
    pub item: Uuid,
}

impl ConversationKey {
    pub fn for_message(viewer: Uuid, message: &Message) -> Self {
        Self {
            counterparty: message.counterparty(viewer).id,
            item: message.item.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub key: ConversationKey,
    pub counterparty: Party,
    pub item: ItemRef,
    /// Oldest first.
    pub messages: Vec<Message>,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    /// Counterparty messages pushed while the thread was not open.
    pub unread: u32,
}

impl Conversation {
    fn new(viewer: Uuid, message: Message) -> Self {
        Self {
            key: ConversationKey::for_message(viewer, &message),
            counterparty: message.counterparty(viewer).clone(),
            item: message.item.clone(),
            last_message: message.text.clone(),
            last_message_time: message.created_at,
            messages: vec![message],
            unread: 0,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Insert in (createdAt, id) order. Returns false for a duplicate id.
    fn insert(&mut self, message: Message) -> bool {
        if self.contains(message.id) {
            return false;
        }

        let at = self
            .messages
            .partition_point(|m| (m.created_at, m.id) < (message.created_at, message.id));
        self.messages.insert(at, message);

        if let Some(last) = self.messages.last() {
            self.last_message = last.text.clone();
            self.last_message_time = last.created_at;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub enum InboxEvent {
    /// Inbox and sent lists fetched over REST.
    HistoryLoaded(Vec<Message>),
    /// The history fetch failed; whatever is already known stays.
    HistoryFailed,
    /// `receiveMessage` from the gateway, or the echo of our own send.
    MessagePushed(Message),
    Opened(ConversationKey),
    Closed,
}

#[derive(Debug, Clone)]
pub struct InboxState {
    viewer: Identity,
    /// Most recent first.
    conversations: Vec<Conversation>,
    open: Option<ConversationKey>,
    history_failed: bool,
}

impl InboxState {
    pub fn new(viewer: Identity) -> Self {
        Self {
            viewer,
            conversations: Vec::new(),
            open: None,
            history_failed: false,
        }
    }

    pub fn viewer(&self) -> &Identity {
        &self.viewer
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, key: &ConversationKey) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.key == key)
    }

    /// The thread currently on screen, if any.
    pub fn open_conversation(&self) -> Option<&Conversation> {
        self.open.as_ref().and_then(|key| self.conversation(key))
    }

    pub fn open_key(&self) -> Option<ConversationKey> {
        self.open
    }

    pub fn history_failed(&self) -> bool {
        self.history_failed
    }

    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread).sum()
    }

    pub fn apply(&mut self, event: InboxEvent) {
        match event {
            InboxEvent::HistoryLoaded(messages) => {
                self.history_failed = false;
                let touched: Vec<ConversationKey> = messages
                    .into_iter()
                    .filter_map(|message| self.merge(message).map(|(key, _)| key))
                    .collect();
                if !touched.is_empty() {
                    self.sort();
                }
            }
            InboxEvent::HistoryFailed => {
                self.history_failed = true;
            }
            InboxEvent::MessagePushed(message) => {
                let from_counterparty = message.sender.id != self.viewer.id;
                if let Some((key, added)) = self.merge(message) {
                    if added && from_counterparty && self.open != Some(key) {
                        if let Some(conversation) = self.find_mut(&key) {
                            conversation.unread += 1;
                        }
                    }
                    self.bring_to_front(&key);
                }
            }
            InboxEvent::Opened(key) => {
                if let Some(conversation) = self.find_mut(&key) {
                    conversation.unread = 0;
                }
                self.open = Some(key);
            }
            InboxEvent::Closed => {
                self.open = None;
            }
        }
    }

    /// Route one message into its thread, creating the thread if needed.
    /// Returns the key and whether the message was new. Messages the viewer
    /// is not a party to are ignored.
    fn merge(&mut self, message: Message) -> Option<(ConversationKey, bool)> {
        let viewer = self.viewer.id;
        if message.sender.id != viewer && message.recipient.id != viewer {
            tracing::warn!("Ignoring message {} not addressed to {}", message.id, viewer);
            return None;
        }

        let key = ConversationKey::for_message(viewer, &message);
        match self.find_mut(&key) {
            Some(conversation) => {
                let added = conversation.insert(message);
                Some((key, added))
            }
            None => {
                self.conversations.push(Conversation::new(viewer, message));
                Some((key, true))
            }
        }
    }

    fn find_mut(&mut self, key: &ConversationKey) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| &c.key == key)
    }

    /// Move the touched thread ahead of its equals, then restore
    /// newest-first order.
    fn bring_to_front(&mut self, key: &ConversationKey) {
        if let Some(pos) = self.conversations.iter().position(|c| &c.key == key) {
            let conversation = self.conversations.remove(pos);
            self.conversations.insert(0, conversation);
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
    }
}

/// Pure form of [`InboxState::apply`].
pub fn reduce(mut state: InboxState, event: InboxEvent) -> InboxState {
    state.apply(event);
    state
}
