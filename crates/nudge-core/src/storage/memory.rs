//! In-memory conversation state store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::StateStore;
use crate::conversation::ConversationState;
use crate::error::StoreError;

/// Non-durable [`StateStore`] for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<BTreeMap<String, ConversationState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, token: &str) -> Result<ConversationState, StoreError> {
        let states = self.states.lock()?;
        Ok(states
            .get(token)
            .cloned()
            .unwrap_or_else(|| ConversationState::new(token)))
    }

    fn put(&self, state: &ConversationState) -> Result<(), StoreError> {
        let mut states = self.states.lock()?;
        states.insert(state.token.clone(), state.clone());
        Ok(())
    }

    fn update(
        &self,
        token: &str,
        apply: &mut dyn FnMut(&mut ConversationState),
    ) -> Result<ConversationState, StoreError> {
        let mut states = self.states.lock()?;
        let state = states
            .entry(token.to_string())
            .or_insert_with(|| ConversationState::new(token));
        apply(state);
        state.token = token.to_string();
        Ok(state.clone())
    }

    fn list_all(&self) -> Result<Vec<ConversationState>, StoreError> {
        let states = self.states.lock()?;
        Ok(states.values().cloned().collect())
    }

    fn remove(&self, token: &str) -> Result<bool, StoreError> {
        let mut states = self.states.lock()?;
        Ok(states.remove(token).is_some())
    }

    fn clear_all(&self) -> Result<usize, StoreError> {
        let mut states = self.states.lock()?;
        let count = states.len();
        states.clear();
        Ok(count)
    }
}
