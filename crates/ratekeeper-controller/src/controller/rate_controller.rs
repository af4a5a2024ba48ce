//! Rate controller
//!
//! Orchestrates one `update` per call:
//!
//! ```text
//! authorize -> config lookup -> pause gate -> timing gate
//!   -> candidate (aggregator | previous + PID delta)
//!   -> clamp -> accrual notification -> store observation (+ PID state)
//! ```
//!
//! Every call either completes or leaves all state untouched: nothing is
//! written before the accrual notifier has accepted the new rate.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use ratekeeper_common::math::{i256_from_u128, saturating_u128, I256};
use ratekeeper_common::{
    Address, BufferError, Observation, RateConfig, RateError, Result, SourceError,
};
use tracing::{debug, info, instrument, warn};

use super::state::{PidSlot, TokenState, TokenStatus, UpdateOutcome};
use crate::aggregator::RateAggregator;
use crate::auth::{AuthorizationPolicy, RoleKind};
use crate::buffer::RateBuffer;
use crate::clamp::ClampEngine;
use crate::clock::{Clock, SystemClock};
use crate::events::{EventLog, EventSink, RateEvent, RateEventKind};
use crate::pid::{PidCalculator, PidConfig, PidState};
use crate::settings::ControllerSettings;
use crate::sources::{AccrualNotifier, SourceRegistry};

/// Bounded rate controller for a set of tokens
pub struct RateController {
    settings: ControllerSettings,
    policy: AuthorizationPolicy,
    sources: SourceRegistry,
    tokens: HashMap<Address, TokenState>,
    clock: Arc<dyn Clock>,
    notifier: Option<Arc<dyn AccrualNotifier>>,
    events: EventLog,
}

impl RateController {
    /// Create a controller with the wall clock and no accrual notifier
    pub fn new(
        settings: ControllerSettings,
        policy: AuthorizationPolicy,
        sources: SourceRegistry,
    ) -> Result<Self> {
        settings.validate()?;

        let events = EventLog::new(settings.event_history);
        Ok(Self {
            settings,
            policy,
            sources,
            tokens: HashMap::new(),
            clock: Arc::new(SystemClock),
            notifier: None,
            events,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Money market notified before every new rate is stored
    pub fn with_notifier(mut self, notifier: Arc<dyn AccrualNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn add_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.events.add_sink(sink);
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut SourceRegistry {
        &mut self.sources
    }

    // ---- configuration ----

    /// Replace the rate config of `token`, allocating its buffer on first use
    #[instrument(skip(self, config))]
    pub fn set_config(&mut self, caller: Address, token: Address, config: RateConfig) -> Result<()> {
        self.policy.require(RoleKind::RateAdmin, caller)?;
        config.validate()?;

        let now = self.clock.now();
        let initialized = match self.tokens.entry(token) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().config = config.clone();
                None
            }
            Entry::Vacant(entry) => {
                let capacity = self.settings.initial_capacity;
                let buffer = RateBuffer::with_capacity(capacity)?;
                entry.insert(TokenState::new(config.clone(), buffer));
                Some(capacity)
            }
        };

        if let Some(capacity) = initialized {
            info!(%token, capacity, "Rates buffer initialized");
            self.emit(caller, Some(token), now, RateEventKind::RatesCapacityInitialized { capacity });
        }

        info!(
            %token,
            base = config.base,
            min = config.min,
            max = config.max,
            components = config.components.len(),
            "Rate config updated"
        );
        self.emit(caller, Some(token), now, RateEventKind::ConfigUpdated { config });
        Ok(())
    }

    /// Attach or replace the PID config of `token`.
    ///
    /// Switching to a different input source resets the accumulated state;
    /// changing gains or the transformer keeps it.
    #[instrument(skip(self, config))]
    pub fn set_pid_config(&mut self, caller: Address, token: Address, config: PidConfig) -> Result<()> {
        self.policy.require(RoleKind::RateAdmin, caller)?;
        config.validate()?;

        let now = self.clock.now();
        let state = self.token_mut(token)?;

        let (pid_state, state_reset) = match &state.pid {
            Some(slot) if slot.config.input_source == config.input_source => (slot.state, false),
            _ => (PidState::new(), true),
        };
        state.pid = Some(PidSlot {
            config,
            state: pid_state,
        });

        info!(%token, input_source = %config.input_source, state_reset, "PID config updated");
        self.emit(caller, Some(token), now, RateEventKind::PidConfigUpdated { config, state_reset });
        Ok(())
    }

    /// Return `token` to the pure aggregator path; returns whether a PID config was removed
    #[instrument(skip(self))]
    pub fn clear_pid_config(&mut self, caller: Address, token: Address) -> Result<bool> {
        self.policy.require(RoleKind::RateAdmin, caller)?;

        let now = self.clock.now();
        let removed = self.token_mut(token)?.pid.take().is_some();

        if removed {
            info!(%token, "PID config cleared");
            self.emit(caller, Some(token), now, RateEventKind::PidConfigCleared);
        }
        Ok(removed)
    }

    /// Pause or unpause updates; returns whether the flag changed.
    ///
    /// Accumulated PID state is kept across pauses.
    #[instrument(skip(self))]
    pub fn set_updates_paused(&mut self, caller: Address, token: Address, paused: bool) -> Result<bool> {
        self.policy.require(RoleKind::UpdatePauseAdmin, caller)?;

        let now = self.clock.now();
        let changed = self.token_mut(token)?.buffer.set_paused(paused);

        if changed {
            info!(%token, paused, "Pause status changed");
            self.emit(caller, Some(token), now, RateEventKind::PauseStatusChanged { paused });
        }
        Ok(changed)
    }

    pub fn rates_capacity(&self, token: Address) -> Result<usize> {
        Ok(self.token(token)?.buffer.capacity())
    }

    /// Grow the buffer of `token`; returns whether the capacity changed
    #[instrument(skip(self))]
    pub fn set_rates_capacity(&mut self, caller: Address, token: Address, capacity: usize) -> Result<bool> {
        self.policy.require(RoleKind::RateAdmin, caller)?;

        let now = self.clock.now();
        let buffer = &mut self.token_mut(token)?.buffer;
        let old_capacity = buffer.capacity();
        let changed = buffer.resize_capacity(capacity)?;

        if changed {
            info!(%token, old_capacity, new_capacity = capacity, "Rates capacity increased");
            self.emit(
                caller,
                Some(token),
                now,
                RateEventKind::RatesCapacityIncreased {
                    old_capacity,
                    new_capacity: capacity,
                },
            );
        }
        Ok(changed)
    }

    // ---- roles ----

    /// Grant or revoke `role` for `account`; returns whether membership changed
    pub fn set_role(
        &mut self,
        caller: Address,
        role: RoleKind,
        account: Address,
        granted: bool,
    ) -> Result<bool> {
        let changed = self.policy.set_role(caller, role, account, granted)?;

        if changed && role == RoleKind::Updater {
            let now = self.clock.now();
            self.emit(caller, None, now, RateEventKind::UpdaterRoleChanged { account, granted });
        }
        Ok(changed)
    }

    /// Allow `account` to call `update`; the zero address opens updating to anyone
    pub fn grant_updater(&mut self, caller: Address, account: Address) -> Result<bool> {
        self.set_role(caller, RoleKind::Updater, account, true)
    }

    pub fn revoke_updater(&mut self, caller: Address, account: Address) -> Result<bool> {
        self.set_role(caller, RoleKind::Updater, account, false)
    }

    // ---- rate changes ----

    /// Run the full pipeline for `token` and store the result
    #[instrument(skip(self))]
    pub fn update(&mut self, caller: Address, token: Address) -> Result<UpdateOutcome> {
        self.policy.require(RoleKind::Updater, caller)?;

        let now = self.clock.now();
        let state = self.token(token)?;

        if state.buffer.is_paused() {
            return Err(BufferError::Paused.into());
        }

        let previous = state.buffer.latest().copied();
        if let Some(previous) = previous {
            let next_update_at = previous.timestamp.saturating_add(self.settings.period_secs);
            if now < next_update_at {
                debug!(%token, next_update_at, "Update not due");
                return Ok(UpdateOutcome::NotDue { next_update_at });
            }
        }
        let previous_rate = previous.map(|o| o.rate);

        let (candidate, pid_state) = match &state.pid {
            Some(slot) => {
                let source = self.sources.input_source(slot.config.input_source)?;
                let (input, target) = match source.get_input_and_target(token) {
                    Ok(reading) => reading,
                    Err(err @ SourceError::Unavailable { .. }) => {
                        warn!(%token, error = %err, "PID input unavailable, skipping period");
                        return Ok(UpdateOutcome::InputUnavailable);
                    }
                    Err(err) => return Err(err.into()),
                };

                let step = PidCalculator::step(&slot.config, &slot.state, input, target)?;
                let anchor = previous_rate.unwrap_or(state.config.base);
                let candidate = apply_delta(anchor, step.delta)?;
                debug!(%token, input, target, delta = %step.delta, candidate, "PID step");
                (candidate, Some(step.state))
            }
            None => {
                let breakdown = RateAggregator::new(&self.sources).aggregate(token, &state.config)?;
                (breakdown.candidate, None)
            }
        };

        let clamped = ClampEngine::clamp(&state.config, previous_rate, candidate)?;

        self.notify_accrual(token)?;

        let observation = Observation::new(candidate, clamped.rate, now);
        let state = self.token_mut(token)?;
        state.buffer.push(observation)?;
        if let (Some(slot), Some(pid_state)) = (state.pid.as_mut(), pid_state) {
            slot.state = pid_state;
        }

        info!(
            %token,
            rate = clamped.rate,
            target = candidate,
            clamped_by = ?clamped.bound,
            "Rate updated"
        );
        self.emit(
            caller,
            Some(token),
            now,
            RateEventKind::RateUpdated {
                rate: clamped.rate,
                target: candidate,
                clamped_by: clamped.bound,
            },
        );

        Ok(UpdateOutcome::Updated(observation))
    }

    /// Store `amount` copies of `(target, rate)` stamped with the current time,
    /// bypassing aggregation, PID and clamping
    #[instrument(skip(self))]
    pub fn manually_push_rate(
        &mut self,
        caller: Address,
        token: Address,
        target: u128,
        rate: u128,
        amount: u32,
    ) -> Result<()> {
        self.policy.require(RoleKind::RateAdmin, caller)?;

        if amount == 0 {
            return Err(RateError::InvalidAmount);
        }
        if self.token(token)?.buffer.is_paused() {
            return Err(BufferError::Paused.into());
        }

        self.notify_accrual(token)?;

        let now = self.clock.now();
        let buffer = &mut self.token_mut(token)?.buffer;
        for _ in 0..amount {
            buffer.manual_push(rate, target, now)?;
        }

        warn!(%token, rate, target, amount, "Rate pushed manually");
        self.emit(
            caller,
            Some(token),
            now,
            RateEventKind::RatePushedManually {
                rate,
                target,
                amount,
            },
        );
        Ok(())
    }

    // ---- reads ----

    /// Latest stored rate of `token`
    pub fn compute_rate(&self, token: Address) -> Result<u128> {
        self.latest_observation(token)
            .map(|o| o.rate)
            .ok_or(RateError::NoObservation(token))
    }

    pub fn latest_observation(&self, token: Address) -> Option<Observation> {
        self.tokens
            .get(&token)
            .and_then(|s| s.buffer.latest().copied())
    }

    pub fn config(&self, token: Address) -> Option<&RateConfig> {
        self.tokens.get(&token).map(|s| &s.config)
    }

    pub fn pid_config(&self, token: Address) -> Option<&PidConfig> {
        self.tokens
            .get(&token)
            .and_then(|s| s.pid.as_ref())
            .map(|slot| &slot.config)
    }

    pub fn pid_state(&self, token: Address) -> Option<&PidState> {
        self.tokens
            .get(&token)
            .and_then(|s| s.pid.as_ref())
            .map(|slot| &slot.state)
    }

    pub fn is_paused(&self, token: Address) -> bool {
        self.tokens
            .get(&token)
            .map(|s| s.buffer.is_paused())
            .unwrap_or(false)
    }

    pub fn status(&self, token: Address) -> TokenStatus {
        self.tokens
            .get(&token)
            .map(TokenState::status)
            .unwrap_or(TokenStatus::Unconfigured)
    }

    /// Configured tokens, sorted
    pub fn tokens(&self) -> Vec<Address> {
        let mut tokens: Vec<Address> = self.tokens.keys().copied().collect();
        tokens.sort();
        tokens
    }

    /// Observation `index` steps back from the latest (0 = latest)
    pub fn rate_at(&self, token: Address, index: usize) -> Result<Observation> {
        let buffer = &self.token(token)?.buffer;
        buffer
            .rate_at(index)
            .copied()
            .ok_or(RateError::Buffer(BufferError::InsufficientData {
                requested: index.saturating_add(1),
                available: buffer.len(),
            }))
    }

    /// `amount` observations, newest first, skipping `offset` and stepping by `increment`
    pub fn rates(
        &self,
        token: Address,
        amount: usize,
        offset: usize,
        increment: usize,
    ) -> Result<Vec<Observation>> {
        Ok(self.token(token)?.buffer.rates(amount, offset, increment)?)
    }

    pub fn rates_count(&self, token: Address) -> usize {
        self.tokens.get(&token).map(|s| s.buffer.len()).unwrap_or(0)
    }

    /// Timestamp of the latest observation, 0 when none
    pub fn last_update_time(&self, token: Address) -> u64 {
        self.latest_observation(token)
            .map(|o| o.timestamp)
            .unwrap_or(0)
    }

    pub fn time_since_last_update(&self, token: Address) -> u64 {
        self.clock.now().saturating_sub(self.last_update_time(token))
    }

    /// Whether an `update` for `token` would pass the config, pause and timing gates
    pub fn needs_update(&self, token: Address) -> bool {
        match self.tokens.get(&token) {
            Some(state) if !state.buffer.is_paused() => {
                state.buffer.is_empty()
                    || self.time_since_last_update(token) >= self.settings.period_secs
            }
            _ => false,
        }
    }

    /// `needs_update` and `caller` holds the updater role
    pub fn can_update(&self, caller: Address, token: Address) -> bool {
        self.needs_update(token) && self.policy.check(RoleKind::Updater, caller)
    }

    /// Up to `limit` recent events, newest first
    pub fn recent_events(&self, limit: usize) -> Vec<RateEvent> {
        self.events.memory().recent(limit)
    }

    // ---- internals ----

    fn token(&self, token: Address) -> Result<&TokenState> {
        self.tokens
            .get(&token)
            .ok_or(RateError::MissingConfig(token))
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut TokenState> {
        self.tokens
            .get_mut(&token)
            .ok_or(RateError::MissingConfig(token))
    }

    fn notify_accrual(&self, token: Address) -> Result<()> {
        if let Some(notifier) = &self.notifier {
            notifier.on_rate_about_to_change(token).map_err(|err| {
                warn!(%token, reason = %err, "Interest accrual rejected");
                RateError::FailedToAccrueInterest {
                    token,
                    reason: err.0,
                }
            })?;
        }
        Ok(())
    }

    fn emit(&self, caller: Address, token: Option<Address>, now: u64, kind: RateEventKind) {
        let mut event = RateEvent::new(caller, now, kind);
        if let Some(token) = token {
            event = event.with_token(token);
        }
        self.events.emit(event);
    }
}

impl std::fmt::Debug for RateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateController")
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .field("sources", &self.sources)
            .field("tokens", &self.tokens.len())
            .field("events", &self.events)
            .finish()
    }
}

/// `anchor + delta`, saturated to the unsigned rate range
fn apply_delta(anchor: u128, delta: I256) -> Result<u128> {
    let anchor = i256_from_u128(anchor)?;
    Ok(match anchor.checked_add(delta) {
        Some(sum) => saturating_u128(sum),
        None if delta.is_negative() => 0,
        None => u128::MAX,
    })
}
