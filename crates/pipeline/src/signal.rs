//! Binary hand-off signals between stages.
//!
//! Each signal is a two-state automaton, `Empty` or `Signaled`. Giving an
//! `Empty` signal makes it `Signaled`; giving a `Signaled` one is coalesced.
//! Taking blocks until `Signaled` and moves it back to `Empty`. Built on a
//! `flume` channel of capacity one, so a pending signal is the one queued
//! unit value.

use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalError {
    /// Every giver is gone and no signal is pending.
    #[error("signal '{0}' closed")]
    Closed(&'static str),
    /// A bounded take expired without a signal.
    #[error("timed out waiting for '{0}'")]
    Timeout(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Empty,
    Signaled,
}

/// Outcome of a give.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Give {
    /// `Empty -> Signaled`.
    Raised,
    /// Already `Signaled`; nothing changed.
    Coalesced,
}

/// Create a signal in the `Empty` state.
pub fn binary(name: &'static str) -> (SignalGiver, SignalTaker) {
    let (tx, rx) = flume::bounded(1);
    (SignalGiver { name, tx }, SignalTaker { name, rx })
}

/// Producer half. Owned by exactly one stage.
#[derive(Debug)]
pub struct SignalGiver {
    name: &'static str,
    tx: Sender<()>,
}

impl SignalGiver {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn give(&self) -> Result<Give, SignalError> {
        match self.tx.try_send(()) {
            Ok(()) => Ok(Give::Raised),
            Err(TrySendError::Full(())) => Ok(Give::Coalesced),
            Err(TrySendError::Disconnected(())) => Err(SignalError::Closed(self.name)),
        }
    }
}

/// Consumer half. Owned by exactly one stage.
#[derive(Debug)]
pub struct SignalTaker {
    name: &'static str,
    rx: Receiver<()>,
}

impl SignalTaker {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> SignalState {
        if self.rx.is_empty() {
            SignalState::Empty
        } else {
            SignalState::Signaled
        }
    }

    /// Block until signaled, with no upper bound.
    pub fn take(&self) -> Result<(), SignalError> {
        self.rx.recv().map_err(|_| SignalError::Closed(self.name))
    }

    /// Block until signaled or `timeout` expires.
    pub fn take_timeout(&self, timeout: Duration) -> Result<(), SignalError> {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(SignalError::Timeout(self.name)),
            Err(RecvTimeoutError::Disconnected) => Err(SignalError::Closed(self.name)),
        }
    }

    /// Either of the above, depending on whether a bound is configured.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<(), SignalError> {
        match timeout {
            Some(timeout) => self.take_timeout(timeout),
            None => self.take(),
        }
    }

    /// Consume a pending signal without blocking. `Ok(false)` when `Empty`.
    pub fn try_take(&self) -> Result<bool, SignalError> {
        match self.rx.try_recv() {
            Ok(()) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(SignalError::Closed(self.name)),
        }
    }
}
