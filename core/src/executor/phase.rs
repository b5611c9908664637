//! Executor lifecycle and its transition rules

use crate::error::ExecutorError;

/// `Idle -> Running(0) -> [Running(i) -> BatchComplete(i)]* -> Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorPhase {
    Idle,
    Running { batch_index: usize },
    BatchComplete { batch_index: usize },
    Done,
}

impl ExecutorPhase {
    /// Check that moving from `self` to `next` is legal.
    pub fn validate(self, next: ExecutorPhase) -> Result<(), ExecutorError> {
        use ExecutorPhase::*;

        let is_valid = match (self, next) {
            // A new run starts from a fresh or a finished executor
            (Idle | Done, Running { batch_index: 0 }) => true,

            (Running { batch_index: a }, BatchComplete { batch_index: b }) => a == b,

            (BatchComplete { batch_index: a }, Running { batch_index: b }) => b == a + 1,

            (BatchComplete { .. }, Done) => true,

            // A plan without batches
            (Running { batch_index: 0 }, Done) => true,

            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(ExecutorError::InvalidTransition {
                from: format!("{self:?}"),
                to: format!("{next:?}"),
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutorPhase::Done)
    }
}
