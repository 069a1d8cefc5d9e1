pub(crate) mod attempt_timing;
pub mod eligibility;
pub mod grading;
pub mod lifecycle;
pub mod scoring;
pub mod statistics;
