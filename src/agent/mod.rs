//! Intent resolution and action dispatch.

pub mod classifier;
pub mod dispatch;
pub mod engine;
pub mod flow;
pub mod intent;
pub mod prompts;
pub mod text;
pub mod turn_log;

pub use classifier::{IntentClassifier, LlmIntentClassifier};
pub use dispatch::{ActionDispatcher, DispatchContext, DispatchOutcome};
pub use engine::{Engine, EngineDeps, TurnLocks};
pub use flow::{FlowInferencer, FlowState};
pub use intent::{Intent, IntentKind, IntentResult};
pub use turn_log::TurnLogger;
