// crates/repid-core/src/entity.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RepIdError;

/// Kind of ratable entity. Raters are themselves ratable entities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A human account.
    User,
    /// An autonomous agent acting on behalf of a user or organization.
    Agent,
    /// A hosted AI model.
    AiModel,
}

impl EntityType {
    /// Stable short tag used in storage keys and CLI arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Agent => "agent",
            EntityType::AiModel => "ai_model",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = RepIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(EntityType::User),
            "agent" => Ok(EntityType::Agent),
            "ai_model" | "model" => Ok(EntityType::AiModel),
            other => Err(RepIdError::validation(
                "entity_type",
                format!("unknown entity type '{}'", other),
            )),
        }
    }
}

/// Identity of an entity without its optional external address.
///
/// This is the unique key of an AggregatedScore row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub id: i64,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, id: i64) -> Self {
        Self { entity_type, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Parses `type:id`, e.g. `user:42` or `ai_model:7`.
impl FromStr for EntityKey {
    type Err = RepIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, id) = s.split_once(':').ok_or_else(|| {
            RepIdError::validation("entity", format!("expected 'type:id', got '{}'", s))
        })?;
        let entity_type = ty.parse()?;
        let id = id.trim().parse::<i64>().map_err(|e| {
            RepIdError::validation("entity_id", format!("invalid id '{}': {}", id, e))
        })?;
        Ok(Self { entity_type, id })
    }
}

/// A rater or rating target as it appears on a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    /// Discriminant: user, agent, or AI model.
    pub entity_type: EntityType,
    /// Numeric id, unique within its entity type.
    pub id: i64,
    /// Optional external address (e.g. a wallet).
    #[serde(default)]
    pub address: Option<String>,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: i64) -> Self {
        Self {
            entity_type,
            id,
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.id)
    }

    /// Whether two references denote the same entity.
    ///
    /// Matches on type+id, or on a shared non-empty external address
    /// (compared case-insensitively, as wallet addresses usually are).
    pub fn same_entity(&self, other: &EntityRef) -> bool {
        if self.key() == other.key() {
            return true;
        }
        match (&self.address, &other.address) {
            (Some(a), Some(b)) => {
                let a = a.trim();
                !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
            }
            _ => false,
        }
    }
}

impl From<EntityKey> for EntityRef {
    fn from(key: EntityKey) -> Self {
        EntityRef::new(key.entity_type, key.id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_key_roundtrips_through_display() {
        let key = EntityKey::new(EntityType::AiModel, 17);
        assert_eq!(key.to_string(), "ai_model:17");
        assert_eq!("ai_model:17".parse::<EntityKey>().unwrap(), key);
    }

    #[test]
    fn entity_key_rejects_garbage() {
        assert!("user".parse::<EntityKey>().is_err());
        assert!("robot:1".parse::<EntityKey>().is_err());
        assert!("user:abc".parse::<EntityKey>().is_err());
    }

    #[test]
    fn same_entity_by_key() {
        let a = EntityRef::new(EntityType::User, 1);
        let b = EntityRef::new(EntityType::User, 1).with_address("0xabc");
        assert!(a.same_entity(&b));
    }

    #[test]
    fn same_entity_by_address_across_ids() {
        let a = EntityRef::new(EntityType::User, 1).with_address("0xABC");
        let b = EntityRef::new(EntityType::Agent, 9).with_address("0xabc");
        assert!(a.same_entity(&b));
    }

    #[test]
    fn different_type_same_id_is_distinct() {
        let a = EntityRef::new(EntityType::User, 1);
        let b = EntityRef::new(EntityType::Agent, 1);
        assert!(!a.same_entity(&b));
    }

    #[test]
    fn empty_addresses_do_not_match() {
        let a = EntityRef::new(EntityType::User, 1).with_address("");
        let b = EntityRef::new(EntityType::User, 2).with_address("");
        assert!(!a.same_entity(&b));
    }
}
