//! Applicant registration: per-step schemas, the wizard reducer, the
//! submission flow and its HTTP surface.

pub mod handlers;
pub mod schemas;
pub mod submit;
pub mod wizard;
