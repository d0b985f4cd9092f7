//! Agent Registry for resolving agent ids to runnable agents
//!
//! This module provides the [`AgentFactory`] contract used by the orchestrator
//! and [`AgentRegistry`], its default implementation.
//!
//! ## Caching
//!
//! A registered constructor runs the first time its id is requested. The
//! instance is cached and shared by later lookups until [`AgentRegistry::evict`]
//! drops it.

use crate::agents::{Agent, AgentDependencies};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves an agent id to an agent instance.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    /// Returns `None` for unknown ids; that is not an error.
    async fn get_agent(&self, agent_id: &str, deps: &AgentDependencies) -> Option<Arc<dyn Agent>>;
}

/// Builds an agent instance from the shared dependencies
pub type AgentConstructor = Arc<dyn Fn(&AgentDependencies) -> Arc<dyn Agent> + Send + Sync>;

/// Registry of agent constructors with a per-id instance cache
pub struct AgentRegistry {
    /// Constructors keyed by agent id
    constructors: HashMap<String, AgentConstructor>,
    /// Instances built so far
    cache: RwLock<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register a constructor for `agent_id`, replacing any previous one
    pub fn register<F>(&mut self, agent_id: &str, constructor: F)
    where
        F: Fn(&AgentDependencies) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        self.constructors
            .insert(agent_id.to_string(), Arc::new(constructor));
        self.cache.write().remove(agent_id);
    }

    /// Register an already built instance
    pub fn register_instance(&mut self, agent: Arc<dyn Agent>) {
        let id = agent.id().to_string();
        let instance = Arc::clone(&agent);
        self.register(&id, move |_| Arc::clone(&instance));
    }

    /// Check if an agent id is registered
    pub fn has_agent(&self, agent_id: &str) -> bool {
        self.constructors.contains_key(agent_id)
    }

    /// Get all registered agent ids
    pub fn agent_ids(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Drop the cached instance for `agent_id`; the next lookup rebuilds it
    pub fn evict(&self, agent_id: &str) -> bool {
        self.cache.write().remove(agent_id).is_some()
    }

    /// Number of instances currently cached
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentFactory for AgentRegistry {
    async fn get_agent(&self, agent_id: &str, deps: &AgentDependencies) -> Option<Arc<dyn Agent>> {
        if let Some(agent) = self.cache.read().get(agent_id) {
            return Some(Arc::clone(agent));
        }

        let constructor = self.constructors.get(agent_id)?;
        let agent = constructor(deps);
        tracing::debug!(agent_id, "constructed agent instance");

        let mut cache = self.cache.write();
        // Another caller may have built the same agent meanwhile; keep the first one.
        Some(Arc::clone(
            cache.entry(agent_id.to_string()).or_insert(agent),
        ))
    }
}

/// Builder for creating AgentRegistry with fluent API
pub struct AgentRegistryBuilder {
    registry: AgentRegistry,
}

impl AgentRegistryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            registry: AgentRegistry::new(),
        }
    }

    /// Add an agent constructor
    pub fn with_agent<F>(mut self, agent_id: &str, constructor: F) -> Self
    where
        F: Fn(&AgentDependencies) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        self.registry.register(agent_id, constructor);
        self
    }

    /// Add a prebuilt agent instance
    pub fn with_instance(mut self, agent: Arc<dyn Agent>) -> Self {
        self.registry.register_instance(agent);
        self
    }

    /// Build the AgentRegistry
    pub fn build(self) -> AgentRegistry {
        self.registry
    }
}

impl Default for AgentRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
