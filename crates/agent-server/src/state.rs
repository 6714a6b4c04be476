//! Application State

use std::sync::Arc;

use agent_core::Agent;
use sheets_assistant::Workbook;

use crate::config::AccessList;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The agent, with its provider, tools and conversation store
    pub agent: Arc<Agent>,

    /// Active spreadsheet shared by every tool
    pub workbook: Arc<Workbook>,

    pub access: Arc<AccessList>,
}

impl AppState {
    pub fn new(agent: Agent, workbook: Arc<Workbook>, access: AccessList) -> Self {
        Self {
            agent: Arc::new(agent),
            workbook,
            access: Arc::new(access),
        }
    }
}
