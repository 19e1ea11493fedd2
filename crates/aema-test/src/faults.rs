//! Fault injection for the mock ledger

use std::collections::{HashMap, HashSet};

/// Ledger operations that can be made to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    HealthCheck,
    Status,
    SuggestedParams,
    AccountInformation,
    ApplicationById,
    /// Every submission, regardless of kind
    Submit,
    PendingInfo,
    Compile,
    /// Submissions that create an application
    CreateApplication,
    /// Submissions that delete an application
    DeleteApplication,
    /// Plain application calls
    CallApplication,
    /// Accepted transactions never confirm
    Confirmation,
}

impl LedgerOp {
    pub const ALL: [LedgerOp; 12] = [
        LedgerOp::HealthCheck,
        LedgerOp::Status,
        LedgerOp::SuggestedParams,
        LedgerOp::AccountInformation,
        LedgerOp::ApplicationById,
        LedgerOp::Submit,
        LedgerOp::PendingInfo,
        LedgerOp::Compile,
        LedgerOp::CreateApplication,
        LedgerOp::DeleteApplication,
        LedgerOp::CallApplication,
        LedgerOp::Confirmation,
    ];
}

/// Which operations fail, and how often each was attempted
#[derive(Debug, Default)]
pub struct FaultPlan {
    failing: HashSet<LedgerOp>,
    /// Successes left before an operation starts failing
    armed: HashMap<LedgerOp, usize>,
    attempts: HashMap<LedgerOp, usize>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle failure of an operation
    pub fn set(&mut self, op: LedgerOp, fail: bool) {
        if fail {
            self.failing.insert(op);
        } else {
            self.failing.remove(&op);
        }
        self.armed.remove(&op);
    }

    /// Let the next `successes` attempts through, then fail every attempt
    pub fn fail_after(&mut self, op: LedgerOp, successes: usize) {
        self.failing.remove(&op);
        self.armed.insert(op, successes);
    }

    pub fn clear(&mut self) {
        self.failing.clear();
        self.armed.clear();
    }

    pub fn is_failing(&self, op: LedgerOp) -> bool {
        self.failing.contains(&op)
    }

    /// Count an attempt and report whether it must fail
    pub fn attempt(&mut self, op: LedgerOp) -> bool {
        *self.attempts.entry(op).or_insert(0) += 1;
        if let Some(left) = self.armed.get_mut(&op) {
            if *left == 0 {
                self.armed.remove(&op);
                self.failing.insert(op);
            } else {
                *left -= 1;
            }
        }
        self.is_failing(op)
    }

    pub fn attempts(&self, op: LedgerOp) -> usize {
        self.attempts.get(&op).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_and_count() {
        let mut plan = FaultPlan::new();
        assert!(!plan.attempt(LedgerOp::Status));

        plan.set(LedgerOp::Status, true);
        assert!(plan.attempt(LedgerOp::Status));
        assert!(!plan.attempt(LedgerOp::Compile));

        plan.set(LedgerOp::Status, false);
        assert!(!plan.attempt(LedgerOp::Status));
        assert_eq!(plan.attempts(LedgerOp::Status), 3);
        assert_eq!(plan.attempts(LedgerOp::Compile), 1);
    }

    #[test]
    fn test_fail_after() {
        let mut plan = FaultPlan::new();
        plan.fail_after(LedgerOp::CallApplication, 2);
        assert!(!plan.attempt(LedgerOp::CallApplication));
        assert!(!plan.attempt(LedgerOp::CallApplication));
        assert!(plan.attempt(LedgerOp::CallApplication));
        assert!(plan.attempt(LedgerOp::CallApplication));

        plan.set(LedgerOp::CallApplication, false);
        assert!(!plan.attempt(LedgerOp::CallApplication));
    }

    #[test]
    fn test_clear() {
        let mut plan = FaultPlan::new();
        for op in LedgerOp::ALL {
            plan.set(op, true);
        }
        plan.clear();
        assert!(LedgerOp::ALL.iter().all(|op| !plan.is_failing(*op)));
    }
}
