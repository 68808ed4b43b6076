//! Model-first intent classifier (C6, §4.5) with deterministic fallback.

mod classifier;
mod request;
mod rules;

pub use classifier::Classifier;
pub use request::ClassifyRequest;
pub use rules::apply_rules;
