//! Conversation log and its reducer.
//!
//! The log is seeded with the user's original prompt and grows in arrival
//! order. Entries are never edited: the only non-append transition is the
//! batch removal of transient `started` entries when a concrete outcome
//! (`file_created`, `command`) arrives.

use kiln_types::{AgentEvent, EntryId, EventKind, NonEmptyString};

/// Who produced an entry. Agent entries carry the event kind they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent(EventKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    id: EntryId,
    speaker: Speaker,
    text: String,
}

impl ConversationEntry {
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub fn speaker(&self) -> &Speaker {
        &self.speaker
    }

    #[must_use]
    pub fn origin(&self) -> Origin {
        match self.speaker {
            Speaker::User => Origin::User,
            Speaker::Agent(_) => Origin::Agent,
        }
    }

    /// Event kind for agent entries; `None` for user entries.
    #[must_use]
    pub fn kind(&self) -> Option<&EventKind> {
        match &self.speaker {
            Speaker::User => None,
            Speaker::Agent(kind) => Some(kind),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    fn is_transient(&self) -> bool {
        self.kind().is_some_and(EventKind::is_transient)
    }
}

/// Input to the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationInput {
    /// Text typed by the user in this client.
    LocalSend(String),
    /// A decoded event from the stream.
    Inbound(AgentEvent),
}

/// What a single `apply` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A user entry was appended. Carries the new build prompt.
    Sent(NonEmptyString),
    /// An agent entry was appended after removing `superseded` transient entries.
    Received { superseded: usize },
    /// Blank local send; the log is unchanged.
    Ignored,
}

/// Ordered conversation log with a monotonic revision counter.
///
/// The TUI uses the revision as a cache key; every mutation bumps it.
#[derive(Debug, Clone)]
pub struct Conversation {
    entries: Vec<ConversationEntry>,
    next_id: EntryId,
    revision: usize,
}

impl Conversation {
    /// Start a log holding a single user entry with the original prompt.
    #[must_use]
    pub fn new(seed: &NonEmptyString) -> Self {
        let first = EntryId::new(1);
        Self {
            entries: vec![ConversationEntry {
                id: first,
                speaker: Speaker::User,
                text: seed.as_str().to_string(),
            }],
            next_id: first.next(),
            revision: 0,
        }
    }

    pub fn apply(&mut self, input: ConversationInput) -> Transition {
        match input {
            ConversationInput::LocalSend(text) => self.send_local(text),
            ConversationInput::Inbound(event) => self.receive(event),
        }
    }

    /// Append a user entry. Blank text is ignored.
    pub fn send_local(&mut self, text: String) -> Transition {
        let Ok(prompt) = NonEmptyString::new(text) else {
            return Transition::Ignored;
        };
        self.push(Speaker::User, prompt.as_str().to_string());
        Transition::Sent(prompt)
    }

    /// Append an agent entry, first dropping superseded transient entries.
    pub fn receive(&mut self, event: AgentEvent) -> Transition {
        let AgentEvent { kind, message } = event;
        let superseded = if kind.supersedes_transient() {
            let before = self.entries.len();
            self.entries.retain(|entry| !entry.is_transient());
            before - self.entries.len()
        } else {
            0
        };
        self.push(Speaker::Agent(kind), message);
        Transition::Received { superseded }
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        let id = self.next_id;
        self.next_id = id.next();
        self.entries.push(ConversationEntry { id, speaker, text });
        self.revision = self.revision.wrapping_add(1);
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn revision(&self) -> usize {
        self.revision
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, ConversationEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a ConversationEntry;
    type IntoIter = std::slice::Iter<'a, ConversationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
