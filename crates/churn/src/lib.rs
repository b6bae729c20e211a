//! Churn Prediction
//!
//! Command implementations behind the `churn` binary.

pub mod commands;
