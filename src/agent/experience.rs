use crate::game::{StateKey, StateVector, ACTION_COUNT};
use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

pub type ActionValues = [f32; ACTION_COUNT];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub state: StateVector,
    pub action_values: ActionValues,
}

/// Bounded state -> action-value table, keyed by encoded state.
///
/// When full, inserting a new key first evicts the most recently inserted
/// entry (LIFO over insertion order), so the oldest entries persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceStore {
    entries: IndexMap<StateKey, Entry>,
    capacity: usize
}

/// Unbounded copy of the store taken for one fit, decoupled from eviction.
pub type Dataset = Vec<(StateVector, ActionValues)>;

impl ExperienceStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity.min(1 << 16)),
            capacity
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &StateKey) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn action_values(&self, key: &StateKey) -> Option<ActionValues> {
        self.entries.get(key).map(|entry| entry.action_values)
    }

    /// Inserts `state` with zeroed action values if absent.
    /// Returns whether the key was newly inserted.
    pub fn observe(&mut self, state: &StateVector) -> bool {
        let key = state.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        if self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.pop() {
                log::trace!("experience store full, evicted {}", evicted);
            }
        }
        self.entries.insert(key, Entry {
            state: *state,
            action_values: [0.0; ACTION_COUNT],
        });
        true
    }

    /// Overwrites one action value; absent keys and bad indices are ignored
    /// and reported with `false`.
    pub fn update(&mut self, key: &StateKey, action_index: usize, value: f32) -> bool {
        match self.entries.get_mut(key).and_then(|entry| entry.action_values.get_mut(action_index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    // insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &Entry)> + '_ {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Dataset {
        self.entries.values().map(|entry| (entry.state, entry.action_values)).collect()
    }
}
