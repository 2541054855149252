//! The feature evaluator and selector resolver (spec §4.4, §4.5): the only
//! crate that owns both the expression engine and a kernel adapter, since
//! resolving a feature's scalars and selectors requires both.

pub mod cancel;
pub mod evaluator;
pub mod resolver;

pub use cancel::CancellationToken;
pub use evaluator::{check_assertions, evaluate_feature, evaluate_part, merge_result, staged_feature_violation, EvalOptions};
pub use resolver::SelectorResolver;
