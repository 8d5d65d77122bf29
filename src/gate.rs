//! Mutually exclusive gate around collaborator round trips.

use crate::error::{AnnotateError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Inpaint,
    Translate,
}

/// Identifies one in-flight round trip. Completions carrying a token that is
/// no longer the live one are stale and must not touch the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobToken {
    pub operation: Operation,
    serial: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Idle,
    Inpainting(JobToken),
    Translating(JobToken),
}

#[derive(Debug, Default)]
pub struct OperationGate {
    state: GateState,
    next_serial: u64,
}

impl OperationGate {
    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn inpainting(&self) -> bool {
        matches!(self.state, GateState::Inpainting(_))
    }

    pub fn translating(&self) -> bool {
        matches!(self.state, GateState::Translating(_))
    }

    pub fn is_busy(&self) -> bool {
        self.state != GateState::Idle
    }

    /// Claim the gate for `operation`; refused while anything else runs.
    pub fn try_begin(&mut self, operation: Operation) -> Result<JobToken> {
        if self.is_busy() {
            return Err(AnnotateError::Busy);
        }
        self.next_serial += 1;
        let token = JobToken {
            operation,
            serial: self.next_serial,
        };
        self.state = match operation {
            Operation::Inpaint => GateState::Inpainting(token),
            Operation::Translate => GateState::Translating(token),
        };
        Ok(token)
    }

    pub fn is_live(&self, token: JobToken) -> bool {
        match self.state {
            GateState::Inpainting(t) | GateState::Translating(t) => t == token,
            GateState::Idle => false,
        }
    }

    /// Release the gate if `token` is the live one. Returns false for stale
    /// tokens, leaving the gate as it is.
    pub fn finish(&mut self, token: JobToken) -> bool {
        if self.is_live(token) {
            self.state = GateState::Idle;
            true
        } else {
            false
        }
    }

    /// Drop whatever is in flight; its completion will arrive stale.
    pub fn reset(&mut self) {
        if self.is_busy() {
            log::warn!("abandoning in-flight operation {:?}", self.state);
        }
        self.state = GateState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_are_mutually_exclusive() {
        let mut gate = OperationGate::default();
        let t = gate.try_begin(Operation::Inpaint).unwrap();
        assert!(gate.inpainting() && !gate.translating());
        assert!(matches!(gate.try_begin(Operation::Translate), Err(AnnotateError::Busy)));
        assert!(matches!(gate.try_begin(Operation::Inpaint), Err(AnnotateError::Busy)));
        assert!(gate.inpainting() && !gate.translating());
        assert!(gate.finish(t));
        assert!(!gate.is_busy());
    }

    #[test]
    fn stale_tokens_do_not_release_a_newer_job() {
        let mut gate = OperationGate::default();
        let old = gate.try_begin(Operation::Translate).unwrap();
        gate.reset();
        let new = gate.try_begin(Operation::Translate).unwrap();
        assert!(!gate.finish(old));
        assert!(gate.translating());
        assert!(gate.finish(new));
        assert!(!gate.finish(new));
    }
}
