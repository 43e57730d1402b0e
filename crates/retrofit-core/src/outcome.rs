use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    AlreadyApplied,
    Drifted,
    /// Empty path or missing file; counted nowhere.
    Unreachable,
}

impl EditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyApplied => "skipped",
            Self::Drifted => "warned",
            Self::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeTally {
    pub applied: u64,
    pub skipped: u64,
    pub warned: u64,
    pub unreachable: u64,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: EditOutcome) {
        match outcome {
            EditOutcome::Applied => self.applied += 1,
            EditOutcome::AlreadyApplied => self.skipped += 1,
            EditOutcome::Drifted => self.warned += 1,
            EditOutcome::Unreachable => self.unreachable += 1,
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "applied={} skipped={} warned={}",
            self.applied, self.skipped, self.warned
        )
    }
}

impl AddAssign for OutcomeTally {
    fn add_assign(&mut self, rhs: Self) {
        self.applied += rhs.applied;
        self.skipped += rhs.skipped;
        self.warned += rhs.warned;
        self.unreachable += rhs.unreachable;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Inapplicable,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Inapplicable => "n/a",
        }
    }
}
