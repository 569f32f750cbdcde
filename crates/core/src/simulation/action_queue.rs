//! Per-frame queue of player ignition requests
//!
//! Clicks are captured as they arrive and only validated when the session
//! drains the queue, right before the frame's simulation ticks. Each executed
//! request keeps its outcome so the UI can give feedback for the frame.

use crate::core_types::Vec3;
use crate::error::SimError;
use crate::simulation::camera::CameraPose;
use crate::simulation::ignition::IgnitionReport;
use std::collections::VecDeque;

/// A controlled burn requested by the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IgnitionRequest {
    /// Clicked world position
    pub position: Vec3,
    /// Camera the click was made from
    pub camera: CameraPose,
    /// Session frame the click was captured in
    pub frame: u64,
}

/// A processed request with its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedRequest {
    pub request: IgnitionRequest,
    pub result: Result<IgnitionReport, SimError>,
}

impl ExecutedRequest {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Pending and executed ignition requests
#[derive(Debug)]
pub struct ActionQueue {
    /// Requests to apply before the next tick
    pending: Vec<IgnitionRequest>,
    /// Requests processed this frame (for UI feedback)
    executed_this_frame: Vec<ExecutedRequest>,
    /// Successful requests this session, oldest first
    history: VecDeque<IgnitionRequest>,
    /// Oldest entries are dropped past this length
    max_history: usize,
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ActionQueue {
    /// Queue that remembers at most `max_history` successful requests
    pub fn new(max_history: usize) -> Self {
        Self {
            pending: Vec::with_capacity(8),
            executed_this_frame: Vec::with_capacity(8),
            history: VecDeque::with_capacity(max_history.min(1024)),
            max_history,
        }
    }

    /// Queue a request for the next drain
    pub fn submit(&mut self, request: IgnitionRequest) {
        self.pending.push(request);
    }

    pub fn pending(&self) -> &[IgnitionRequest] {
        &self.pending
    }

    pub fn executed_this_frame(&self) -> &[ExecutedRequest] {
        &self.executed_this_frame
    }

    pub fn history(&self) -> impl Iterator<Item = &IgnitionRequest> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Forget the previous frame's outcomes
    pub fn begin_frame(&mut self) {
        self.executed_this_frame.clear();
    }

    /// Take all pending requests for processing
    pub fn take_pending(&mut self) -> Vec<IgnitionRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Drop pending requests without executing them
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Record the outcome of a processed request
    pub fn mark_executed(&mut self, request: IgnitionRequest, result: Result<IgnitionReport, SimError>) {
        if result.is_ok() {
            self.history.push_back(request);
            while self.history.len() > self.max_history {
                self.history.pop_front();
            }
        }
        self.executed_this_frame.push(ExecutedRequest { request, result });
    }

    /// Reset for a restarted session
    pub fn clear(&mut self) {
        self.pending.clear();
        self.executed_this_frame.clear();
        self.history.clear();
    }
}
