pub mod config;
pub mod engine;
pub mod factors;
pub mod validation;

pub use config::*;
pub use engine::{calculate_score, compute_score, FactorContribution, ScoreBreakdown, ScoreResult};
pub use factors::{Bucket, RangeOp};
pub use validation::validate_scoring;
