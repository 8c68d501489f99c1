//! Pool of assignable display names
//!
//! The pool is the single source of truth for whether the server is full:
//! one name per live session, so capacity is exactly the number of names the
//! pool was built with. Released names go back to the front and are handed
//! out next (LIFO reuse).

use crate::error::{ChatError, Result};
use log::warn;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct NamePool {
    /// Names not currently assigned, next to allocate at the front
    available: VecDeque<String>,
    /// Total number of names the pool was configured with
    capacity: usize,
}

impl NamePool {
    /// Builds a pool from the configured names, dropping duplicates
    ///
    /// The first name given is the first one allocated.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut available: VecDeque<String> = VecDeque::new();
        for name in names {
            let name = name.into();
            if !available.contains(&name) {
                available.push_back(name);
            }
        }

        Self {
            capacity: available.len(),
            available,
        }
    }

    /// Takes the next available name
    pub fn allocate(&mut self) -> Result<String> {
        self.available
            .pop_front()
            .ok_or(ChatError::CapacityExhausted)
    }

    /// Returns a name to the pool so it is the next one allocated
    ///
    /// A name that is already pooled is ignored, as is anything that would
    /// push the pool past its configured capacity.
    pub fn release(&mut self, name: String) {
        if self.available.contains(&name) {
            warn!("Name {} released twice, ignoring", name);
            return;
        }

        if self.available.len() >= self.capacity {
            warn!("Name {} released into a full pool, ignoring", name);
            return;
        }

        self.available.push_front(name);
    }

    pub fn has_capacity(&self) -> bool {
        !self.available.is_empty()
    }

    /// Number of names still available
    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, name: &str) -> bool {
        self.available.iter().any(|n| n == name)
    }

    /// Available names in allocation order
    pub fn available(&self) -> Vec<String> {
        self.available.iter().cloned().collect()
    }
}
