//! Rate controller events
//!
//! Every state change the controller commits is recorded as a [`RateEvent`]
//! and fanned out to the registered sinks:
//! - [`TracingEventSink`]: one structured log line per event
//! - [`MemoryEventSink`]: bounded history of recent events

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use ratekeeper_common::{Address, RateConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clamp::ClampBound;
use crate::pid::PidConfig;

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateEventKind {
    RateUpdated {
        rate: u128,
        target: u128,
        /// Bound that moved the candidate, if any
        clamped_by: Option<ClampBound>,
    },
    RatePushedManually {
        rate: u128,
        target: u128,
        amount: u32,
    },
    ConfigUpdated {
        config: RateConfig,
    },
    PidConfigUpdated {
        config: PidConfig,
        state_reset: bool,
    },
    PidConfigCleared,
    PauseStatusChanged {
        paused: bool,
    },
    RatesCapacityInitialized {
        capacity: usize,
    },
    RatesCapacityIncreased {
        old_capacity: usize,
        new_capacity: usize,
    },
    UpdaterRoleChanged {
        account: Address,
        granted: bool,
    },
}

impl RateEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            RateEventKind::RateUpdated { .. } => "rate_updated",
            RateEventKind::RatePushedManually { .. } => "rate_pushed_manually",
            RateEventKind::ConfigUpdated { .. } => "config_updated",
            RateEventKind::PidConfigUpdated { .. } => "pid_config_updated",
            RateEventKind::PidConfigCleared => "pid_config_cleared",
            RateEventKind::PauseStatusChanged { .. } => "pause_status_changed",
            RateEventKind::RatesCapacityInitialized { .. } => "rates_capacity_initialized",
            RateEventKind::RatesCapacityIncreased { .. } => "rates_capacity_increased",
            RateEventKind::UpdaterRoleChanged { .. } => "updater_role_changed",
        }
    }
}

/// A committed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEvent {
    /// Unique event ID (UUID v7, time-ordered)
    pub event_id: String,

    /// Timestamp (Unix seconds, controller clock)
    pub timestamp: u64,

    /// Token the event applies to; `None` for role changes
    pub token: Option<Address>,

    /// Account that triggered the change
    pub caller: Address,

    pub kind: RateEventKind,
}

impl RateEvent {
    pub fn new(caller: Address, timestamp: u64, kind: RateEventKind) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            timestamp,
            token: None,
            caller,
            kind,
        }
    }

    pub fn with_token(mut self, token: Address) -> Self {
        self.token = Some(token);
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Event sink
pub trait EventSink: Send + Sync {
    fn write(&self, event: &RateEvent);
}

/// Writes events to the tracing subscriber
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn write(&self, event: &RateEvent) {
        let token = event
            .token
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());

        info!(
            event_id = %event.event_id,
            kind = event.kind.name(),
            %token,
            caller = %event.caller,
            payload = %event.to_json(),
            "Rate event"
        );
    }
}

/// Keeps the most recent events in memory
pub struct MemoryEventSink {
    events: RwLock<VecDeque<RateEvent>>,
    max_events: usize,
}

impl MemoryEventSink {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Up to `limit` events, newest first
    pub fn recent(&self, limit: usize) -> Vec<RateEvent> {
        self.events.read().iter().rev().take(limit).cloned().collect()
    }

    /// Events for `token`, newest first
    pub fn for_token(&self, token: Address) -> Vec<RateEvent> {
        self.events
            .read()
            .iter()
            .rev()
            .filter(|e| e.token == Some(token))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for MemoryEventSink {
    fn write(&self, event: &RateEvent) {
        if self.max_events == 0 {
            return;
        }

        let mut events = self.events.write();
        while events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Fans events out to every sink
pub struct EventLog {
    sinks: Vec<Arc<dyn EventSink>>,
    memory: Arc<MemoryEventSink>,
}

impl EventLog {
    /// Log with a tracing sink and a memory sink holding `history` events
    pub fn new(history: usize) -> Self {
        let memory = Arc::new(MemoryEventSink::new(history));
        let sinks: Vec<Arc<dyn EventSink>> = vec![
            Arc::new(TracingEventSink),
            memory.clone() as Arc<dyn EventSink>,
        ];
        Self { sinks, memory }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn emit(&self, event: RateEvent) {
        for sink in &self.sinks {
            sink.write(&event);
        }
    }

    pub fn memory(&self) -> &Arc<MemoryEventSink> {
        &self.memory
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("sinks", &self.sinks.len())
            .field("history", &self.memory.len())
            .finish()
    }
}
