use std::fmt;
use std::time::Duration;

/// Recorded result of one dispatched request. Produced once, immutable,
/// consumed by the threshold evaluator and discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestOutcome {
    pub operation: OpRef,
    pub latency: Duration,
    pub success: bool,
}

/// Which operation an outcome belongs to. `Connect` covers failed
/// connection attempts, which count against the run but are not part of
/// the weighted table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpRef {
    /// Index into the scenario's operation table, in declaration order.
    Op(usize),
    Connect,
}

/// Run lifecycle. Transitions are driven by stage progression; terminal
/// states come from the threshold verdict. No outcomes are accepted once
/// the run reaches `Evaluating`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Pending,
    Ramping,
    Steady,
    RampingDown,
    Evaluating,
    Passed,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Pending => "pending",
            RunPhase::Ramping => "ramping",
            RunPhase::Steady => "steady",
            RunPhase::RampingDown => "ramping-down",
            RunPhase::Evaluating => "evaluating",
            RunPhase::Passed => "passed",
            RunPhase::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
