//! The seam between the orchestration loops and the delegated browsing
//! agent. The loops consume only [`BrowsingAgent::run`]; how the agent
//! locates elements, reasons about the page, or clicks is its own business.

mod llm;

pub use llm::LlmAgent;

use crate::Result;
use async_trait::async_trait;

/// One entry in the ordered result sequence of an agent run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentStep {
    /// Free text the agent extracted or reported for this step.
    pub extracted_text: Option<String>,

    /// Whether the agent considered the task complete at this step.
    pub is_done: bool,

    /// Step-level error reported by the agent.
    pub error: Option<String>,
}

impl AgentStep {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            extracted_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self {
            extracted_text: Some(text.into()),
            is_done: true,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// The delegated collaborator: runs a natural-language task against the
/// page within a step budget and returns its result entries in order.
///
/// Implementations are not expected to be reentrant; the orchestration
/// loops drive exactly one task at a time.
#[async_trait]
pub trait BrowsingAgent: Send + Sync {
    async fn run(&self, task: &str, step_budget: u32) -> Result<Vec<AgentStep>>;
}
