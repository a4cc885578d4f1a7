//! Recruiter shortlist: AI scores joined onto applications, ranked and
//! filtered, with a local quick score when the AI is unavailable.

pub mod handlers;
pub mod normalize;
pub mod quick_score;
pub mod ranking;
