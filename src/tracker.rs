//! Transaction state tracker
//!
//! Guards a session against duplicate concurrent submissions. A new
//! submission may start only when nothing is in flight, fewer than
//! `max_attempts` attempts have been recorded, and the cooldown since the
//! last attempt start has fully elapsed.
//!
//! The tracker takes no locks; it is mutated only by the orchestrating
//! caller. Time comes from `tokio::time::Instant` so the cooldown follows
//! the runtime clock (and a paused clock in tests).

use solana_sdk::signature::Signature;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::TrackerConfig;

/// Snapshot of the tracked state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionState {
    /// Attempts made for the current logical transaction
    pub attempt_count: u32,
    /// True while an attempt is in flight
    pub is_processing: bool,
    /// Most recently sent signature, kept for post-hoc verification
    pub last_signature: Option<Signature>,
    /// Start time of the most recent attempt
    pub last_attempt_time: Option<Instant>,
}

/// Why a new submission is not allowed right now
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AttemptBlocked {
    #[error("a transaction is already in progress")]
    Processing,

    #[error("cooling down, {remaining_ms}ms until the next attempt is allowed")]
    CoolingDown { remaining_ms: u64 },

    #[error("attempt limit reached ({attempts}/{max_attempts}); reset required")]
    AttemptsExhausted { attempts: u32, max_attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct TransactionTracker {
    state: TransactionState,
    max_attempts: u32,
    cooldown: Duration,
}

impl TransactionTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            state: TransactionState::default(),
            max_attempts: config.max_attempts,
            cooldown: config.cooldown(),
        }
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    /// Evaluate the admission invariant at `now`, without side effects
    pub fn check_at(&self, now: Instant) -> Result<(), AttemptBlocked> {
        if self.state.is_processing {
            return Err(AttemptBlocked::Processing);
        }

        if let Some(last) = self.state.last_attempt_time {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.cooldown {
                return Err(AttemptBlocked::CoolingDown {
                    remaining_ms: u64::try_from((self.cooldown - elapsed).as_millis())
                        .unwrap_or(u64::MAX),
                });
            }
        }

        if self.state.attempt_count >= self.max_attempts {
            return Err(AttemptBlocked::AttemptsExhausted {
                attempts: self.state.attempt_count,
                max_attempts: self.max_attempts,
            });
        }

        Ok(())
    }

    pub fn check(&self) -> Result<(), AttemptBlocked> {
        self.check_at(Instant::now())
    }

    pub fn can_attempt_new_transaction(&self) -> bool {
        self.check().is_ok()
    }

    pub fn record_attempt_start(&mut self) {
        self.record_attempt_start_at(Instant::now());
    }

    pub fn record_attempt_start_at(&mut self, now: Instant) {
        self.state.attempt_count += 1;
        self.state.is_processing = true;
        self.state.last_attempt_time = Some(now);
    }

    pub fn record_signature(&mut self, signature: Signature) {
        self.state.last_signature = Some(signature);
    }

    /// Success clears everything; failure only ends processing so repeated
    /// failures eventually exhaust the attempt budget.
    pub fn record_terminal_outcome(&mut self, success: bool) {
        if success {
            self.reset();
        } else {
            self.state.is_processing = false;
        }
    }

    /// Undo an attempt that failed before reaching the network (no wallet,
    /// signing refused). It does not count against the budget.
    pub fn record_precondition_failure(&mut self) {
        self.state.attempt_count = self.state.attempt_count.saturating_sub(1);
        self.state.is_processing = false;
    }

    /// Unconditional abandonment. Does not cancel in-flight network calls.
    pub fn reset(&mut self) {
        self.state = TransactionState::default();
    }
}
