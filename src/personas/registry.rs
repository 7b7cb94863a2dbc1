//! Personality registry for managing persona definitions.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::error;

use super::builtins;
use super::{Participant, Personality};
use crate::message::USER_PARTICIPANT_ID;

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Personality>,
    order: Vec<String>,
}

/// Registry for personalities.
///
/// Thread-safe storage for persona definitions with built-in personas
/// automatically registered on creation. Listing preserves registration
/// order.
pub struct PersonalityRegistry {
    entries: RwLock<Entries>,
}

impl PersonalityRegistry {
    /// Create a new registry with built-in personas.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// Create a registry with no personas.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Register a personality.
    ///
    /// # Errors
    /// Returns error if the id is empty, reserved, or already registered.
    pub fn register(&self, personality: Personality) -> Result<(), String> {
        if personality.id.trim().is_empty() {
            return Err("Personality ID is required".to_string());
        }
        if personality.id == USER_PARTICIPANT_ID {
            return Err(format!(
                "Personality ID '{}' is reserved for the human user",
                USER_PARTICIPANT_ID
            ));
        }
        if personality.name.trim().is_empty() {
            return Err("Personality name is required".to_string());
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.by_id.contains_key(&personality.id) {
            return Err(format!("Personality '{}' already exists", personality.id));
        }

        entries.order.push(personality.id.clone());
        entries.by_id.insert(personality.id.clone(), personality);
        Ok(())
    }

    /// Get a personality by ID.
    pub fn get(&self, id: &str) -> Option<Personality> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .cloned()
    }

    /// List all personalities in registration order.
    pub fn list(&self) -> Vec<Personality> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id).cloned())
            .collect()
    }

    /// Build a fresh, all-active participant roster.
    pub fn participants(&self) -> Vec<Participant> {
        self.list().iter().map(Participant::from).collect()
    }

    /// Get the number of registered personalities.
    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    fn register_builtins(&self) {
        for personality in builtins::builtin_personalities() {
            let id = personality.id.clone();
            if let Err(e) = self.register(personality) {
                error!(
                    persona = %id,
                    error = %e,
                    "Failed to register builtin persona - this indicates a programming error"
                );
            }
        }
    }
}

impl Default for PersonalityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
