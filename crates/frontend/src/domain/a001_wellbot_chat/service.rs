//! WellBot Chat - async pipelines (history load, send)
//!
//! Both pipelines talk to the backend through [`ChatApi`] and mutate the
//! session only through a [`SessionStore`], so they run the same way against
//! Leptos signals in the browser and against a `RefCell` in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::a001_wellbot_chat::dto::{ChatReply, HistoryResponse, SendRequest};
use contracts::domain::a001_wellbot_chat::error::ChatError;
use contracts::domain::a001_wellbot_chat::session::{ChatSession, HistoryOutcome, SendOutcome};
use std::cell::RefCell;

/// Backend chat endpoints
#[async_trait(?Send)]
pub trait ChatApi {
    type Attachment: Clone;

    async fn fetch_history(&self, user_id: &str) -> Result<HistoryResponse, ChatError>;

    async fn post_message(
        &self,
        request: SendRequest<Self::Attachment>,
    ) -> Result<ChatReply, ChatError>;
}

/// Owner of the session state
///
/// `None` means the session is gone (e.g. the component was unmounted while a
/// request was in flight).
pub trait SessionStore<A> {
    fn with_session<R>(&self, f: impl FnOnce(&mut ChatSession<A>) -> R) -> Option<R>;
}

impl<A> SessionStore<A> for RefCell<ChatSession<A>> {
    fn with_session<R>(&self, f: impl FnOnce(&mut ChatSession<A>) -> R) -> Option<R> {
        Some(f(&mut self.borrow_mut()))
    }
}

/// Load the user's history into the session
///
/// Failures are logged and leave the session as it was.
pub async fn load_history<Api, S>(
    api: &Api,
    store: &S,
    now: impl Fn() -> DateTime<Utc>,
) -> HistoryOutcome
where
    Api: ChatApi,
    S: SessionStore<Api::Attachment>,
{
    let Some((ticket, user_id)) =
        store.with_session(|s| (s.begin_history_load(), s.user_id().to_string()))
    else {
        return HistoryOutcome::Stale;
    };

    match api.fetch_history(&user_id).await {
        Ok(response) => {
            let messages = response.into_messages(now());
            let outcome = store
                .with_session(|s| s.apply_history(ticket, messages))
                .unwrap_or(HistoryOutcome::Stale);
            match outcome {
                HistoryOutcome::Stale => {
                    log::debug!("History load #{} superseded, result dropped", ticket.id())
                }
                _ => log::info!("✅ Chat history loaded: {:?}", outcome),
            }
            outcome
        }
        Err(e) => {
            log::error!(
                "❌ Error fetching chat history: {} (retryable={})",
                e,
                e.is_retryable()
            );
            store
                .with_session(|s| s.fail_history(ticket))
                .unwrap_or(HistoryOutcome::Stale)
        }
    }
}

/// Send the current draft
///
/// Returns `None` when there is nothing to send (blank draft or a send already
/// in flight); no request is issued in that case.
pub async fn send_message<Api, S>(
    api: &Api,
    store: &S,
    now: impl Fn() -> DateTime<Utc>,
) -> Option<SendOutcome>
where
    Api: ChatApi,
    S: SessionStore<Api::Attachment>,
{
    let ticket = store.with_session(|s| s.begin_send(now())).flatten()?;
    let has_attachment = ticket.request.attachment.is_some();
    log::debug!(
        "Sending message #{} (attachment: {})",
        ticket.id,
        has_attachment
    );

    let result = api
        .post_message(ticket.request)
        .await
        .map(|reply| reply.response);

    if let Err(e) = &result {
        log::error!(
            "❌ Error sending message: {} (retryable={})",
            e,
            e.is_retryable()
        );
    }

    let outcome = store
        .with_session(|s| s.complete_send(ticket.id, result, now()))
        .unwrap_or(SendOutcome::Stale);
    if outcome == SendOutcome::Stale {
        log::warn!("Send #{} completed after being superseded", ticket.id);
    }
    Some(outcome)
}
