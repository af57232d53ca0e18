//! Rubric scorer: converts a finished transcript into a weighted grade over
//! inquiry (40%), diagnosis (35%) and communication (25%).

pub mod communication;
pub mod config;
pub mod diagnosis;
pub mod engine;
pub mod feedback;
pub mod inquiry;
pub mod text;

pub use config::{RubricConfig, RubricStandards, RubricWeights};
pub use diagnosis::classify_diagnosis;
pub use engine::{RubricScorer, PASS_MARK};
pub use feedback::grade_for;
