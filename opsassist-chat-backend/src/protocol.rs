use opsassist_core::recents::RecentAction;
use opsassist_core::session::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// --- 1. Events from Frontend ---
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum ClientEvent {
    // Free-typed chat input
    #[serde(rename = "send")]
    Send { text: String },

    // A submitted action form
    #[serde(rename = "action")]
    Action {
        action_id: String,
        #[serde(default)]
        data: HashMap<String, String>,
    },

    // Reset the conversation
    #[serde(rename = "clear")]
    Clear,

    // Wipe the recent actions history
    #[serde(rename = "clear_recents")]
    ClearRecents,

    #[serde(rename = "set_mock_mode")]
    SetMockMode { enabled: bool },
}

// --- 2. Events to Frontend ---
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    // One appended transcript message
    #[serde(rename = "message")]
    Message { message: Message },

    // For status updates (e.g., endpoint fallback, rejected form)
    #[serde(rename = "status_update")]
    StatusUpdate {
        status: String,
        details: Option<String>,
    },

    // Full refresh of the recent actions sidebar
    #[serde(rename = "recent_actions")]
    RecentActions { actions: Vec<RecentActionView> },

    // The conversation was reset; carries the replacement session id
    #[serde(rename = "cleared")]
    Cleared { session_id: Uuid },
}

/// A recent action entry as the sidebar shows it.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecentActionView {
    pub id: String,
    pub label: String,
    pub timestamp: i64,
    pub class_name: String,
    pub prompt: String,
}

impl RecentActionView {
    pub fn from_entry(entry: &RecentAction) -> Self {
        Self {
            id: entry.id.clone(),
            label: entry.display_label(),
            timestamp: entry.timestamp,
            class_name: entry.class_name.clone(),
            prompt: entry.prompt.clone(),
        }
    }
}
