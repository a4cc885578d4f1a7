//! Video learning plans: duration arithmetic, the completion gate, stake
//! payouts and the watched set.

pub mod completion;
pub mod duration;
pub mod handlers;
pub mod payout;
pub mod plan;
pub mod repository;
