use std::time::Instant;

/// Where a step stands in a saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step is executing (or the run was interrupted while it was).
    Running,
    /// Step executed successfully.
    Executed,
    /// Step failed after exhausting its retries.
    Failed,
    /// Step input was rejected by the type check; the step body never ran.
    Rejected,
    /// Step was revoked successfully.
    Revoked,
    /// Step revocation failed.
    RevokeFailed,
}

/// One entry per step the run reached.
#[derive(Debug)]
pub struct StepRecord {
    /// Position of the step in the saga.
    pub index: usize,
    /// Step name as reported by the step itself.
    pub name: String,
    /// Latest status; revocation overwrites the execution outcome.
    pub status: StepStatus,
    /// How many times the step was invoked, retries included.
    pub attempts: u32,
    /// Time the first attempt began.
    pub started_at: Instant,
    /// When the step last changed state (execution or revocation).
    pub completed_at: Option<Instant>,
}

/// Execution and revocation history of a saga run.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
    cancelled_before: Option<usize>,
}

impl SagaAuditLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, index: usize, name: &str) {
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Running,
            attempts: 0,
            started_at: Instant::now(),
            completed_at: None,
        });
    }

    pub(crate) fn record_success(&mut self, attempts: u32) {
        self.finish_last(StepStatus::Executed, attempts);
    }

    pub(crate) fn record_failure(&mut self, attempts: u32) {
        self.finish_last(StepStatus::Failed, attempts);
    }

    pub(crate) fn record_rejected(&mut self) {
        self.finish_last(StepStatus::Rejected, 0);
    }

    pub(crate) fn record_cancelled(&mut self, index: usize) {
        self.cancelled_before = Some(index);
    }

    pub(crate) fn record_revoked(&mut self, index: usize) {
        self.mark(index, StepStatus::Revoked);
    }

    pub(crate) fn record_revoke_failed(&mut self, index: usize) {
        self.mark(index, StepStatus::RevokeFailed);
    }

    fn finish_last(&mut self, status: StepStatus, attempts: u32) {
        if let Some(record) = self.records.last_mut() {
            record.status = status;
            record.attempts = attempts;
            record.completed_at = Some(Instant::now());
        }
    }

    fn mark(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.records.iter_mut().find(|record| record.index == index) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Records in execution order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Index of the step the run stopped in front of, if it was cancelled.
    #[must_use]
    pub fn cancelled_before(&self) -> Option<usize> {
        self.cancelled_before
    }

    /// One line per record, prefixed with a status marker, plus a trailing
    /// line if the run was cancelled.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Running => "…",
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Rejected => "≠",
                StepStatus::Revoked => "↩",
                StepStatus::RevokeFailed => "⚠",
            };
            if record.attempts > 1 {
                lines.push(format!(
                    "{status} {} ({} attempts)",
                    record.name, record.attempts
                ));
            } else {
                lines.push(format!("{status} {}", record.name));
            }
        }
        if let Some(index) = self.cancelled_before {
            lines.push(format!("⊘ cancelled before step {index}"));
        }
        lines.join("\n")
    }
}
