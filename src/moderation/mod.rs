pub mod context;
pub mod dispatch;
pub mod engine;
pub mod intake;
pub mod messages;
pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod report;

pub use context::{CollectedContext, ContextCollector, History};
pub use dispatch::{ActionDispatcher, DispatchTarget};
pub use engine::DecisionEngine;
pub use orchestrator::{Orchestrator, PipelineOutcome};
pub use parse::parse_response;
pub use prompt::PromptContext;
pub use report::{
    ActionOutcome, Decision, HistoryItem, Report, ReportDraft, ReportStatus, Transition,
    UserProfile, Verdict,
};
