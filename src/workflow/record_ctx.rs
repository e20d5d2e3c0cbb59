//! Record processing context
//!
//! Wraps "which record of the batch am I on" for log prefixes

use std::fmt::Display;

use crate::models::ProgramType;

#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 1-based position in the batch (display only)
    pub index: usize,

    pub total: usize,

    pub identifier: String,

    pub program: ProgramType,
}

impl RecordCtx {
    pub fn new(index: usize, total: usize, identifier: impl Into<String>, program: ProgramType) -> Self {
        Self {
            index,
            total,
            identifier: identifier.into(),
            program,
        }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}]", self.index, self.total)
    }
}
