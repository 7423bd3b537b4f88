//! Pass boundaries and cooperative job control.
//!
//! The legalizer never suspends mid-pass. Between passes it calls a
//! [`PassObserver`], which may block (to pause the job) or answer
//! [`PassControl::Cancel`] to stop before the next pass begins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// The legalization passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pass {
    /// Replace top-level port markers with pads and I/O macros.
    InsertPads,
    /// Bind pads to package sites.
    BindIo,
    /// Split I/O macros into elementary buffers.
    DecomposeIo,
    /// Rename elementary buffers to BEL types and check pad electricals.
    TransformIo,
    /// Bind delay, serializer and DDR cells to companion sites.
    Iologic,
    /// Replicate the shared delay controller per clock region.
    MergeControl,
    /// Final type renaming, cleanup and validation.
    FinalTransform,
}

impl Pass {
    /// All passes in execution order.
    pub const ALL: [Pass; 7] = [
        Pass::InsertPads,
        Pass::BindIo,
        Pass::DecomposeIo,
        Pass::TransformIo,
        Pass::Iologic,
        Pass::MergeControl,
        Pass::FinalTransform,
    ];

    /// Returns the pass that runs after this one.
    pub fn next(self) -> Option<Pass> {
        let pos = Self::ALL.iter().position(|&p| p == self)?;
        Self::ALL.get(pos + 1).copied()
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The observer's answer at a pass boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassControl {
    /// Run the next pass.
    Continue,
    /// Stop before the next pass.
    Cancel,
}

/// Receives callbacks at pass boundaries.
pub trait PassObserver {
    /// Called before `pass` runs.
    fn pass_started(&self, pass: Pass) -> PassControl;

    /// Called after `pass` completes.
    fn pass_finished(&self, _pass: Pass) -> PassControl {
        PassControl::Continue
    }
}

/// An observer that always continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunToCompletion;

impl PassObserver for RunToCompletion {
    fn pass_started(&self, _pass: Pass) -> PassControl {
        PassControl::Continue
    }
}

#[derive(Debug, Default)]
struct JobState {
    paused: bool,
    cancelled: bool,
    current: Option<Pass>,
}

/// A thread-safe pause/cancel switch shared between the legalizer and a
/// controlling thread.
///
/// While paused, the legalizer blocks at the next pass boundary until
/// [`JobControl::resume`] or [`JobControl::cancel`] is called.
#[derive(Debug, Default)]
pub struct JobControl {
    state: Mutex<JobState>,
    wake: Condvar,
}

impl JobControl {
    /// Creates a running, uncancelled controller.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests a pause at the next pass boundary.
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Lifts a pause.
    pub fn resume(&self) {
        self.lock().paused = false;
        self.wake.notify_all();
    }

    /// Requests cancellation; also releases a paused legalizer.
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.wake.notify_all();
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Returns the pass most recently started, if any.
    pub fn current_pass(&self) -> Option<Pass> {
        self.lock().current
    }
}

impl PassObserver for JobControl {
    fn pass_started(&self, pass: Pass) -> PassControl {
        let mut state = self.lock();
        while state.paused && !state.cancelled {
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.cancelled {
            return PassControl::Cancel;
        }
        state.current = Some(pass);
        PassControl::Continue
    }

    fn pass_finished(&self, _pass: Pass) -> PassControl {
        if self.lock().cancelled {
            PassControl::Cancel
        } else {
            PassControl::Continue
        }
    }
}
