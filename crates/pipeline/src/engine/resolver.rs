//! Fixed-capacity operator registry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PipelineError, PipelineResult};

/// Operators the classifier graph is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    FullyConnected,
    Softmax,
}

impl Op {
    /// Every operator the classifier needs, in registration order.
    pub const REQUIRED: [Op; 2] = [Op::FullyConnected, Op::Softmax];
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("resolver full ({capacity} ops), cannot add {op:?}")]
    Full { op: Op, capacity: usize },
    #[error("{0:?} already registered")]
    Duplicate(Op),
}

#[derive(Debug, Clone, Default)]
pub struct OpResolver {
    ops: Vec<Op>,
}

impl OpResolver {
    pub const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self { ops: Vec::with_capacity(Self::CAPACITY) }
    }

    /// A resolver with every operator in [`Op::REQUIRED`] registered.
    pub fn with_required_ops() -> PipelineResult<Self> {
        let mut resolver = Self::new();
        for op in Op::REQUIRED {
            resolver
                .add(op)
                .map_err(|e| PipelineError::OpRegistration(e.to_string()))?;
        }
        Ok(resolver)
    }

    /// Register `op`. A full resolver refuses any further op, registered or not.
    pub fn add(&mut self, op: Op) -> Result<(), RegisterError> {
        if self.ops.len() == Self::CAPACITY {
            return Err(RegisterError::Full { op, capacity: Self::CAPACITY });
        }
        if self.ops.contains(&op) {
            return Err(RegisterError::Duplicate(op));
        }
        self.ops.push(op);
        Ok(())
    }

    pub fn contains(&self, op: Op) -> bool {
        self.ops.contains(&op)
    }

    /// First required operator that has not been registered.
    pub fn first_missing(&self, required: &[Op]) -> Option<Op> {
        required.iter().copied().find(|op| !self.contains(*op))
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
