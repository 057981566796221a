//! Pure selection and scoring core. Nothing in here touches the database or
//! the clock; services feed it snapshots and persist what it returns.

pub mod daily;
pub mod queue;
pub mod scoring;
pub mod weighting;
