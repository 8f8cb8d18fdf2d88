//! HTTP middleware.
//!
//! Execution order (outermost → innermost):
//! `TraceLayer → metrics → authenticate → handler`.

pub mod metrics;
