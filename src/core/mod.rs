//! Core grading logic.
//!
//! This module contains:
//! - Aggregator: sub-score range policy and totals
//! - Ids: collision-checked question identifiers
//! - Grader: oracle prompt, call and tolerant reply parsing

pub mod aggregator;
pub mod grader;
pub mod ids;

// Re-export commonly used types
pub use aggregator::{RangePolicy, MAX_SUB_SCORE, MIN_SUB_SCORE};
pub use grader::{build_prompt, parse_response, Grader, SYSTEM_PROMPT};
pub use ids::{IdForm, IdGenerator, DEFAULT_RETRY_BUDGET};
