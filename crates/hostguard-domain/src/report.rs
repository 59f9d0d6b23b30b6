use hostguard_types::{AuditOutcome, Bucket};

/// Raw outcomes of a run, before post-processing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuditResults {
    pub success: Vec<AuditOutcome>,
    pub failure: Vec<AuditOutcome>,
    pub skipped: Vec<AuditOutcome>,
    pub controlled: Vec<AuditOutcome>,
}

impl AuditResults {
    pub fn push(&mut self, bucket: Bucket, outcome: AuditOutcome) {
        self.bucket_mut(bucket).push(outcome);
    }

    pub fn bucket(&self, bucket: Bucket) -> &[AuditOutcome] {
        match bucket {
            Bucket::Success => &self.success,
            Bucket::Failure => &self.failure,
            Bucket::Skipped => &self.skipped,
            Bucket::Controlled => &self.controlled,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<AuditOutcome> {
        match bucket {
            Bucket::Success => &mut self.success,
            Bucket::Failure => &mut self.failure,
            Bucket::Skipped => &mut self.skipped,
            Bucket::Controlled => &mut self.controlled,
        }
    }

    /// Append `other` bucket by bucket, preserving order.
    pub fn extend(&mut self, other: AuditResults) {
        self.success.extend(other.success);
        self.failure.extend(other.failure);
        self.skipped.extend(other.skipped);
        self.controlled.extend(other.controlled);
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty()
            && self.failure.is_empty()
            && self.skipped.is_empty()
            && self.controlled.is_empty()
    }

    /// `floor(100 * (success + controlled) / (success + failure + controlled))`,
    /// `None` when nothing was evaluated.
    pub fn compliance_percent(&self) -> Option<u32> {
        let passing = self.success.len() + self.controlled.len();
        let total = passing + self.failure.len();
        if total == 0 {
            return None;
        }
        Some((passing * 100 / total) as u32)
    }
}
