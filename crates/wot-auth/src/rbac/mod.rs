//! Permission-based authorization.

pub mod evaluator;

pub use evaluator::AuthorizationEvaluator;
