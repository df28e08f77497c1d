//! Machine learning evaluation metrics module
//!
//! Provides metrics for evaluating regression models and forecasts.

pub mod regression;
