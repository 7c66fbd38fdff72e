//! Pure protocol checks used by the orchestrator and the verifier.

pub mod recency;
pub mod threshold;

pub use recency::{check_rbn_recency, RecencyError};
pub use threshold::{evaluate_thresholds, QuorumShortfall, ThresholdError, ThresholdShortfall};
