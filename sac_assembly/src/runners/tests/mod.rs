//! Driver tests against the full assembled unit list.
//!
//! # Test Organization
//!
//! - `runner_tests`: hook sequencing, counters, limits and error attribution
//!   over a fake environment and learner
