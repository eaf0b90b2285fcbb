use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::pricing::{AllocationRatios, PricingMode};
use crate::error::SettleError;

/// Stable external identifier of a settling entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of an entity inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityIdx(usize);

/// Settlement role of an entity.
///
/// A represented user holds a back-index to its agent; the agent's user list
/// lives in its [`AgentBook`], so there is no ownership cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    DirectUser,
    RepresentedUser { agent: EntityIdx },
    Agent { book: usize },
}

/// Role tag without registry indices, used in outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Direct,
    Represented,
    Agent,
}

impl RoleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Represented => "represented",
            Self::Agent => "agent",
        }
    }
}

impl From<Role> for RoleKind {
    fn from(role: Role) -> Self {
        match role {
            Role::DirectUser => Self::Direct,
            Role::RepresentedUser { .. } => Self::Represented,
            Role::Agent { .. } => Self::Agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub role: Role,
}

/// An agent's relationship table: its users and the terms it settles them on.
///
/// Terms are kept as configured (possibly absent) and checked by
/// [`AgentBook::terms`] when the agent is settled.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentBook {
    pub agent: EntityIdx,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    /// Represented users paired with their pricing mode.
    pub users: Vec<(EntityIdx, Option<PricingMode>)>,
}

/// Validated settlement terms of one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTerms {
    pub ratios: AllocationRatios,
    /// Pricing mode per user, parallel to [`AgentBook::users`].
    pub pricing: Vec<PricingMode>,
}

impl AgentBook {
    /// Resolves and range-checks the agent's γ, θ, and every user's pricing mode.
    ///
    /// # Errors
    ///
    /// [`SettleError::MissingConfiguration`] when γ, θ, or a pricing mode is
    /// absent; [`SettleError::InvalidRange`] when a value is out of bounds.
    pub fn terms(&self, registry: &Registry) -> Result<AgentTerms, SettleError> {
        let agent_id = registry.entity(self.agent).id.clone();
        let missing = |what: String| SettleError::MissingConfiguration {
            agent: agent_id.clone(),
            what,
        };

        let gamma = self.gamma.ok_or_else(|| missing("gamma".to_string()))?;
        let theta = self.theta.ok_or_else(|| missing("theta".to_string()))?;
        let ratios = AllocationRatios::new(&agent_id, gamma, theta)?;

        let mut pricing = Vec::with_capacity(self.users.len());
        for (user, mode) in &self.users {
            let user_id = &registry.entity(*user).id;
            let mode = mode.ok_or_else(|| missing(format!("pricing mode for user {user_id}")))?;
            mode.validate(&agent_id)?;
            pricing.push(mode);
        }

        Ok(AgentTerms { ratios, pricing })
    }
}

/// Arena of all entities in a run plus the per-agent user tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entities: Vec<Entity>,
    index: HashMap<EntityId, EntityIdx>,
    books: Vec<AgentBook>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: EntityId, role: Role) -> Result<EntityIdx, SettleError> {
        if self.index.contains_key(&id) {
            return Err(SettleError::DuplicateEntity(id));
        }
        let idx = EntityIdx(self.entities.len());
        self.index.insert(id.clone(), idx);
        self.entities.push(Entity { id, role });
        Ok(idx)
    }

    /// Registers a user that settles directly with the market.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::DuplicateEntity`] if `id` is already registered.
    pub fn add_direct(&mut self, id: EntityId) -> Result<EntityIdx, SettleError> {
        self.insert(id, Role::DirectUser)
    }

    /// Registers an agent with its (possibly missing) allocation ratios.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::DuplicateEntity`] if `id` is already registered.
    pub fn add_agent(
        &mut self,
        id: EntityId,
        gamma: Option<f64>,
        theta: Option<f64>,
    ) -> Result<EntityIdx, SettleError> {
        let book = self.books.len();
        let idx = self.insert(id, Role::Agent { book })?;
        self.books.push(AgentBook {
            agent: idx,
            gamma,
            theta,
            users: Vec::new(),
        });
        Ok(idx)
    }

    /// Registers a user represented by `agent` under `pricing`.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::NotAnAgent`] if `agent` does not index an agent
    /// of this registry and [`SettleError::DuplicateEntity`] if `id` is
    /// already registered.
    pub fn add_represented(
        &mut self,
        agent: EntityIdx,
        id: EntityId,
        pricing: Option<PricingMode>,
    ) -> Result<EntityIdx, SettleError> {
        let book = match self.entities.get(agent.0) {
            Some(Entity {
                role: Role::Agent { book },
                ..
            }) => *book,
            Some(entity) => return Err(SettleError::NotAnAgent(entity.id.clone())),
            None => return Err(SettleError::NotAnAgent(format!("#{}", agent.0).into())),
        };
        let idx = self.insert(id, Role::RepresentedUser { agent })?;
        self.books[book].users.push((idx, pricing));
        Ok(idx)
    }

    /// Returns the entity at `idx`.
    pub fn entity(&self, idx: EntityIdx) -> &Entity {
        &self.entities[idx.0]
    }

    /// Resolves an external identifier.
    pub fn lookup(&self, id: &EntityId) -> Option<EntityIdx> {
        self.index.get(id).copied()
    }

    /// Returns the agent representing `user`, if it is a represented user.
    pub fn agent_of(&self, user: EntityIdx) -> Option<&Entity> {
        match self.entity(user).role {
            Role::RepresentedUser { agent } => Some(self.entity(agent)),
            _ => None,
        }
    }

    /// Iterates every registered entity in registration order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityIdx, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityIdx(i), e))
    }

    /// Direct users in registration order.
    pub fn direct_users(&self) -> impl Iterator<Item = (EntityIdx, &Entity)> {
        self.entities()
            .filter(|(_, e)| matches!(e.role, Role::DirectUser))
    }

    /// Agent relationship tables in registration order.
    pub fn books(&self) -> &[AgentBook] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
