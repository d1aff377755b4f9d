//! Storage key addressing: `<agent>/{patterns,solutions,decisions}/<uuid>.rec`
//! and `global/<key>.rec`.

use crate::types::AgentName;
use std::path::PathBuf;
use uuid::Uuid;

/// The three per-agent collections a key may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Patterns.
    Patterns,
    /// Solutions.
    Solutions,
    /// Decisions.
    Decisions,
}

impl Collection {
    fn dirname(self) -> &'static str {
        match self {
            Self::Patterns => "patterns",
            Self::Solutions => "solutions",
            Self::Decisions => "decisions",
        }
    }
}

/// A fully addressed storage key: either an agent-scoped entity or a
/// global key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKey {
    /// An entity owned by one agent.
    Entity {
        /// Owning agent.
        agent: AgentName,
        /// Which collection it lives in.
        collection: Collection,
        /// The entity's own id.
        id: Uuid,
    },
    /// A key in the `global/` partition, not owned by any one agent.
    Global(String),
}

impl StorageKey {
    /// A pattern key for `agent`/`id`.
    #[must_use]
    pub fn pattern(agent: AgentName, id: Uuid) -> Self {
        Self::Entity {
            agent,
            collection: Collection::Patterns,
            id,
        }
    }

    /// A solution key for `agent`/`id`.
    #[must_use]
    pub fn solution(agent: AgentName, id: Uuid) -> Self {
        Self::Entity {
            agent,
            collection: Collection::Solutions,
            id,
        }
    }

    /// A decision key for `agent`/`id`.
    #[must_use]
    pub fn decision(agent: AgentName, id: Uuid) -> Self {
        Self::Entity {
            agent,
            collection: Collection::Decisions,
            id,
        }
    }

    /// Path relative to the storage root, with the `.rec` extension.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::Entity {
                agent,
                collection,
                id,
            } => PathBuf::from(agent.as_str())
            .join(collection.dirname())
            .join(format!("{id}.rec")),
            Self::Global(key) => PathBuf::from("global").join(format!("{key}.rec")),
        }
    }

    /// A stable string form used for per-key locking and cache keys.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Entity {
                agent,
                collection,
                id,
            } => format!("{}:{}:{id}", agent.as_str(), collection.dirname()),
            Self::Global(key) => format!("global:{key}"),
        }
    }

    /// The owning agent, if this key is agent-scoped.
    #[must_use]
    pub fn agent(&self) -> Option<&AgentName> {
        match self {
            Self::Entity { agent,.. } => Some(agent),
            Self::Global(_) => None,
        }
    }
}
