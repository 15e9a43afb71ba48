use crate::session::{ChatApiRequest, PromptKind, Responder};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Pause before each canned reply, so the UI's loading state stays visible.
pub const MOCK_RESPONSE_DELAY_MS: u64 = 1000;

/// Canned replies for free-typed chat input, keyed on the lowercased text.
pub fn chat_response(input: &str) -> Vec<String> {
    match input.to_lowercase().as_str() {
        "hello" => vec!["Hello! How can I help you with VM management today?".to_string()],
        _ => default_chat_response(),
    }
}

pub fn default_chat_response() -> Vec<String> {
    vec![
        "I understand you need help with VM management. Could you please be more specific about what you'd like to do?"
            .to_string(),
    ]
}

/// Canned replies for action prompts. Keys are the unsubstituted templates,
/// so a prompt with real values falls through to the default pair.
pub fn action_response(prompt: &str) -> Vec<String> {
    match prompt {
        "Can you list all VMs?" => vec![
            "Here are your VMs:\n\n- VM-DEV-01 (Running)\n- VM-PROD-01 (Running)\n- VM-TEST-01 (Stopped)"
                .to_string(),
        ],
        "Can you start VM {vmName} in resource group {resourceGroup}?" => vec![
            "Starting the VM. This may take a few minutes...".to_string(),
            "VM started successfully!".to_string(),
        ],
        "Can you stop VM {vmName} in resource group {resourceGroup}?" => vec![
            "Stopping the VM. This may take a few minutes...".to_string(),
            "VM stopped successfully!".to_string(),
        ],
        "Can you restart VM {vmName} in resource group {resourceGroup}?" => vec![
            "Restarting the VM. This may take a few minutes...".to_string(),
            "VM restarted successfully!".to_string(),
        ],
        _ => default_action_response(),
    }
}

pub fn default_action_response() -> Vec<String> {
    vec![
        "I'll help you manage that VM. Please wait while I process your request...".to_string(),
        "Operation completed successfully!".to_string(),
    ]
}

/// Serves the canned catalogs behind the [`Responder`] seam, after a fixed
/// delay that mimics a round trip.
#[derive(Clone, Debug)]
pub struct MockResponder {
    delay: Duration,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(MOCK_RESPONSE_DELAY_MS),
        }
    }

    /// Zero-delay variant for tests.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub async fn canned(&self, prompt: &str, kind: PromptKind) -> Vec<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match kind {
            PromptKind::Text => chat_response(prompt),
            PromptKind::Action => action_response(prompt),
        }
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(&self, request: &ChatApiRequest, kind: PromptKind) -> Result<Vec<String>> {
        Ok(self.canned(&request.prompt, kind).await)
    }
}
