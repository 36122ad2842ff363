pub mod buffer;
pub mod realtime;
pub mod rules;

pub use buffer::SmoothingBuffer;
pub use realtime::{
    best_match, Classification, ClassifierState, Mode, PoseClassifier, UNKNOWN_POSE,
};
pub use rules::{classify_by_rules, is_rule_exercise, RuleMatch, RULE_EXERCISES};
