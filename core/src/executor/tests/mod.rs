//! Tests for the execution sandbox
//!
//! Organized by feature area

mod helpers;
