//! Historical rate buffer
//!
//! Fixed-capacity ring of [`Observation`]s for one token:
//! - Writes go to a cursor; once the ring is full the oldest slot is overwritten
//! - Capacity only grows, and growing never drops or rewrites existing entries
//! - A paused buffer rejects writes but keeps serving reads
//!
//! Growing a wrapped ring lays the retained observations out oldest first
//! with the cursor at the end, so the new slots fill before anything is
//! overwritten again.

use ratekeeper_common::{BufferError, Observation, MAX_RATES_CAPACITY};

/// Ring buffer of rate observations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBuffer {
    /// Occupied slots; never longer than `capacity`
    observations: Vec<Observation>,
    /// Slot written by the next push
    next: usize,
    capacity: usize,
    paused: bool,
}

impl RateBuffer {
    /// Create an empty, unpaused buffer
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 || capacity > MAX_RATES_CAPACITY {
            return Err(BufferError::InvalidCapacity {
                current: 0,
                requested: capacity,
                limit: MAX_RATES_CAPACITY,
            });
        }

        Ok(Self {
            observations: Vec::with_capacity(capacity),
            next: 0,
            capacity,
            paused: false,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of observations currently retained
    #[inline]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Append an observation, overwriting the oldest one when full
    pub fn push(&mut self, observation: Observation) -> Result<(), BufferError> {
        if self.paused {
            return Err(BufferError::Paused);
        }

        if self.next >= self.observations.len() && self.observations.len() < self.capacity {
            self.observations.push(observation);
        } else {
            if self.next >= self.observations.len() {
                self.next = 0;
            }
            self.observations[self.next] = observation;
        }
        self.next += 1;
        Ok(())
    }

    /// Administrative write of an already-final rate
    pub fn manual_push(&mut self, rate: u128, target: u128, timestamp: u64) -> Result<(), BufferError> {
        self.push(Observation::new(target, rate, timestamp))
    }

    /// Grow the capacity; shrinking is rejected.
    ///
    /// Returns whether the capacity changed.
    pub fn resize_capacity(&mut self, new_capacity: usize) -> Result<bool, BufferError> {
        if new_capacity < self.capacity || new_capacity > MAX_RATES_CAPACITY {
            return Err(BufferError::InvalidCapacity {
                current: self.capacity,
                requested: new_capacity,
                limit: MAX_RATES_CAPACITY,
            });
        }

        if new_capacity == self.capacity {
            return Ok(false);
        }

        if !self.observations.is_empty() {
            let oldest = self.next % self.observations.len();
            self.observations.rotate_left(oldest);
            self.next = self.observations.len();
        }
        self.observations
            .reserve_exact(new_capacity - self.observations.len());
        self.capacity = new_capacity;
        Ok(true)
    }

    /// Set the pause flag; returns whether it changed
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.paused != paused;
        self.paused = paused;
        changed
    }

    /// Most recent observation
    pub fn latest(&self) -> Option<&Observation> {
        self.rate_at(0)
    }

    /// Observation `index` steps back from the latest (0 = latest)
    pub fn rate_at(&self, index: usize) -> Option<&Observation> {
        let len = self.observations.len();
        if index >= len {
            return None;
        }
        let slot = (self.next + len - 1 - index) % len;
        self.observations.get(slot)
    }

    /// `amount` observations, newest first, skipping `offset` and stepping by
    /// `increment` (0 behaves as 1)
    pub fn rates(
        &self,
        amount: usize,
        offset: usize,
        increment: usize,
    ) -> Result<Vec<Observation>, BufferError> {
        if amount == 0 {
            return Ok(Vec::new());
        }

        let increment = increment.max(1);
        let required = (amount - 1)
            .checked_mul(increment)
            .and_then(|span| span.checked_add(offset))
            .and_then(|span| span.checked_add(1))
            .unwrap_or(usize::MAX);

        if required > self.len() {
            return Err(BufferError::InsufficientData {
                requested: required,
                available: self.len(),
            });
        }

        Ok((0..amount)
            .filter_map(|i| self.rate_at(offset + i * increment).copied())
            .collect())
    }

    /// Observations from newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &Observation> + '_ {
        (0..self.len()).filter_map(move |i| self.rate_at(i))
    }
}
