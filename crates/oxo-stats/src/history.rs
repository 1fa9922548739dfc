use std::collections::VecDeque;

use serde::{Deserialize, Deserializer, Serialize};

/// An append-only series that keeps at most `capacity` of its newest entries.
///
/// Serialized as a plain array; the capacity is restored by the owner through
/// [`BoundedHistory::with_capacity_from`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoundedHistory<T> {
    #[serde(skip)]
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> BoundedHistory<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuilds a history from loaded entries, keeping only the newest `capacity`.
    #[must_use]
    pub fn with_capacity_from<I>(capacity: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'de, T> Deserialize<'de> for BoundedHistory<T>
where
    T: Deserialize<'de>,
{
    // Capacity is unknown until the owner re-bounds it; keep everything.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = VecDeque::<T>::deserialize(deserializer)?;
        Ok(Self {
            capacity: entries.len().max(1),
            entries,
        })
    }
}
