//! Runtime observability.
//!
//! Contains the feature-gated span profiler. With the `profiling` feature
//! enabled, instrumented scopes are recorded and written out as a Chrome
//! Trace file on shutdown; without it, every entry point compiles to a
//! no-op.

pub mod profiler;
