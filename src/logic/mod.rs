//! Domain logic, independent of the HTTP layer

pub mod dispatch;
pub mod enhancer;
pub mod session;
pub mod triage;
