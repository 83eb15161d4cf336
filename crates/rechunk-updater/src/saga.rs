use std::fmt;
use std::time::Duration;

use rechunk_crypto::Checksum;
use rechunk_types::ChunkSize;

// ---------------------------------------------------------------------------
// SagaStep
// ---------------------------------------------------------------------------

/// One forward step of an update.
///
/// Steps run strictly in [`SagaStep::FORWARD`] order. Only the last step is
/// compensated: if it fails, every chunk of the object is removed. Earlier
/// steps touch chunks only and are safe to re-run, so their failures
/// propagate as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SagaStep {
    /// Upsert chunks `0..n` in ascending index order.
    WriteChunks,
    /// Remove chunks at index `n` and above.
    PruneTail,
    /// Apply the effective patch to the metadata record.
    ApplyPatch,
}

impl SagaStep {
    /// Forward steps in execution order.
    pub const FORWARD: [SagaStep; 3] = [Self::WriteChunks, Self::PruneTail, Self::ApplyPatch];

    /// Whether a failure of this step triggers the chunk rollback.
    pub fn is_compensated(self) -> bool {
        matches!(self, Self::ApplyPatch)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::WriteChunks => "write-chunks",
            Self::PruneTail => "prune-tail",
            Self::ApplyPatch => "apply-patch",
        }
    }
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Recorded result of a completed step.
#[derive(Clone, Debug)]
pub struct StepReport {
    pub step: SagaStep,
    /// Records written, removed or modified by the step.
    pub records: u64,
    /// Wall-clock time the step took.
    pub elapsed: Duration,
}

/// Outcome of a successful update.
#[derive(Clone, Debug)]
pub struct UpdateReport {
    /// Number of chunk records the object now has.
    pub chunk_count: u64,
    /// Total payload length in bytes.
    pub length: u64,
    /// Chunk size the payload was split with.
    pub chunk_size: ChunkSize,
    /// Digest written to the metadata record.
    pub checksum: Checksum,
    /// Stale chunks removed from a previously longer object.
    pub pruned: u64,
    /// Per-step results in execution order.
    pub steps: Vec<StepReport>,
    /// Total wall-clock time.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_order() {
        assert_eq!(
            SagaStep::FORWARD,
            [SagaStep::WriteChunks, SagaStep::PruneTail, SagaStep::ApplyPatch]
        );
    }

    #[test]
    fn only_patch_is_compensated() {
        let compensated: Vec<_> = SagaStep::FORWARD
            .into_iter()
            .filter(|s| s.is_compensated())
            .collect();
        assert_eq!(compensated, vec![SagaStep::ApplyPatch]);
    }

    #[test]
    fn display_names() {
        assert_eq!(SagaStep::WriteChunks.to_string(), "write-chunks");
        assert_eq!(SagaStep::PruneTail.to_string(), "prune-tail");
        assert_eq!(SagaStep::ApplyPatch.to_string(), "apply-patch");
    }
}
