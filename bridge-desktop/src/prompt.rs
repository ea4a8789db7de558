//! Headless user prompt
//!
//! Answers confirmations with a fixed reply and records notifications instead
//! of showing dialogs.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    prompt::{MessageLevel, UserPrompt},
};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// `UserPrompt` for hosts without a window
#[derive(Debug)]
pub struct HeadlessPrompt {
    answer: bool,
    confirmations: Mutex<Vec<String>>,
    notifications: Mutex<Vec<(String, MessageLevel)>>,
}

impl HeadlessPrompt {
    /// Prompt that answers every confirmation with `answer`
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            confirmations: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Prompt that agrees to everything
    pub fn accepting() -> Self {
        Self::new(true)
    }

    /// Prompt that declines everything
    pub fn declining() -> Self {
        Self::new(false)
    }

    /// Questions asked so far, oldest first
    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Notifications shown so far, oldest first
    pub fn notifications(&self) -> Vec<(String, MessageLevel)> {
        self.notifications
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for HeadlessPrompt {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl UserPrompt for HeadlessPrompt {
    async fn confirm(&self, message: &str) -> Result<bool> {
        if let Ok(mut asked) = self.confirmations.lock() {
            asked.push(message.to_string());
        }
        info!(answer = self.answer, "Confirmation requested: {}", message);
        Ok(self.answer)
    }

    async fn notify(&self, message: &str, level: MessageLevel) -> Result<()> {
        match level {
            MessageLevel::Info => info!("{}", message),
            MessageLevel::Warning => warn!("{}", message),
            MessageLevel::Error => error!("{}", message),
        }
        if let Ok(mut shown) = self.notifications.lock() {
            shown.push((message.to_string(), level));
        }
        Ok(())
    }
}
