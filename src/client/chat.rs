//! Chat client
//!
//! Fetches the shared room one page at a time and posts messages under the
//! [`AuthSession`]. The latest page, oldest message first, is published on a
//! watch channel; both the background [`ChatPoller`] and the refresh after a
//! send write to it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::auth::AuthSession;
use super::error::{parse_response, ClientError};
use crate::config::ClientConfig;
use crate::db::ChatMessage;
use crate::routes::chat::{MessageList, SendMessageResponse, MAX_MESSAGE_LEN};

/// Time between chat polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct ChatClient {
    auth: AuthSession,
    page_size: u32,
    poll_interval: Duration,
    messages: Arc<watch::Sender<Vec<ChatMessage>>>,
}

#[derive(Serialize)]
struct SendBody<'a> {
    message: &'a str,
}

/// Trimmed message, or why it cannot be sent
pub fn validate_outgoing(message: &str) -> Result<&str, ClientError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation("Message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(ClientError::Validation(
            "Message is too long (max 1000 characters)".to_string(),
        ));
    }
    Ok(trimmed)
}

impl ChatClient {
    pub fn new(auth: AuthSession, page_size: u32) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            auth,
            page_size,
            poll_interval: DEFAULT_POLL_INTERVAL,
            messages: Arc::new(messages),
        }
    }

    pub fn from_config(auth: AuthSession, config: &ClientConfig) -> Self {
        Self::new(auth, config.chat_page_size).with_poll_interval(config.chat_poll_interval())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Receiver for the latest page of messages
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.messages.subscribe()
    }

    /// Last published page
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.borrow().clone()
    }

    /// Fetch one page, oldest message first
    pub async fn fetch(&self, offset: u32) -> Result<Vec<ChatMessage>, ClientError> {
        let response = self
            .auth
            .http()
            .get(self.auth.endpoint("/chat/messages"))
            .query(&[("limit", self.page_size), ("offset", offset)])
            .send()
            .await?;
        let body: MessageList = parse_response(response, "Failed to fetch messages").await?;

        let mut messages = body.messages;
        messages.reverse();
        Ok(messages)
    }

    /// Fetch the newest page and publish it
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let messages = self.fetch(0).await?;
        self.messages.send_replace(messages);
        Ok(())
    }

    /// Post a message and refresh the room
    ///
    /// The message is checked before anything is sent. A 401 from the server
    /// signs the session out.
    pub async fn send(&self, message: &str) -> Result<ChatMessage, ClientError> {
        let text = validate_outgoing(message)?;
        let token = self.auth.token().ok_or(ClientError::NotAuthenticated)?;

        let response = self
            .auth
            .http()
            .post(self.auth.endpoint("/chat/messages"))
            .bearer_auth(&token)
            .json(&SendBody { message: text })
            .send()
            .await?;

        let body: SendMessageResponse = match parse_response(response, "Failed to send message").await {
            Ok(body) => body,
            Err(ClientError::Api { status: 401, message }) => {
                tracing::info!(reason = %message, "Token rejected while sending, signing out");
                self.auth.logout().await;
                return Err(ClientError::NotAuthenticated);
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Refresh after send failed");
        }
        Ok(body.message)
    }

    /// Poll the room at the configured interval until the returned handle
    /// is dropped
    ///
    /// The first poll runs immediately.
    pub fn start_polling(&self) -> ChatPoller {
        let client = self.clone();
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = client.refresh().await {
                    tracing::warn!(error = %e, "Chat poll failed");
                }
            }
        });
        ChatPoller { handle }
    }
}

/// Background poll task; stops when dropped
///
/// Requests already in flight are not cancelled mid-response; the task is
/// aborted at its next suspension point.
pub struct ChatPoller {
    handle: JoinHandle<()>,
}

impl ChatPoller {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ChatPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
