//! WellBot Chat - View Model

use super::model::HttpChatApi;
use crate::domain::a001_wellbot_chat::service::{load_history, send_message, SessionStore};
use crate::shared::config::AppConfig;
use chrono::Utc;
use contracts::domain::a001_wellbot_chat::aggregate::ChatMessage;
use contracts::domain::a001_wellbot_chat::session::{ChatSession, SessionPhase};
use leptos::prelude::*;

/// Session with a browser file handle as attachment
pub type BrowserSession = ChatSession<web_sys::File>;

#[derive(Clone, Copy)]
pub struct WellbotChatVm {
    /// `web_sys::File` is not `Send`, hence local storage
    pub session: RwSignal<BrowserSession, LocalStorage>,
    /// Bound to the textarea; copied into the session on send
    pub draft: RwSignal<String>,
    api: StoredValue<HttpChatApi>,
}

impl WellbotChatVm {
    pub fn new(config: &AppConfig) -> Self {
        let session = ChatSession::new(config.session.user_id.clone())
            .with_user_conditions(config.session.user_conditions.clone())
            .with_attachment_policy(config.session.attachment_policy());

        Self {
            session: RwSignal::new_local(session),
            draft: RwSignal::new(String::new()),
            api: StoredValue::new(HttpChatApi::new(config.server.clone())),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.session.with(|s| s.messages().to_vec())
    }

    pub fn message_count(&self) -> usize {
        self.session.with(|s| s.messages().len())
    }

    pub fn is_sending(&self) -> bool {
        self.session.with(|s| s.phase() == SessionPhase::Sending)
    }

    pub fn attachment_name(&self) -> Option<String> {
        self.session.with(|s| s.attachment().map(|f| f.name()))
    }

    pub fn set_attachment(&self, file: Option<web_sys::File>) {
        self.session.update(|s| s.set_attachment(file));
    }

    /// Fetch history once on mount
    pub fn load(&self) {
        let vm = *self;
        let api = vm.api.get_value();
        wasm_bindgen_futures::spawn_local(async move {
            load_history(&api, &vm, Utc::now).await;
        });
    }

    /// Send the current draft; no-op for a blank draft or while a send is in flight
    pub fn send(&self) {
        let vm = *self;
        let text = vm.draft.get_untracked();
        if text.trim().is_empty() || vm.session.with_untracked(|s| s.is_in_flight()) {
            return;
        }
        vm.session.update(|s| s.set_draft(text));

        let api = vm.api.get_value();
        wasm_bindgen_futures::spawn_local(async move {
            if send_message(&api, &vm, Utc::now).await.is_some() {
                if let Some(draft) = vm.session.try_with_untracked(|s| s.draft().to_string()) {
                    vm.draft.set(draft);
                }
            }
        });
    }
}

impl SessionStore<web_sys::File> for WellbotChatVm {
    fn with_session<R>(&self, f: impl FnOnce(&mut BrowserSession) -> R) -> Option<R> {
        self.session.try_update(f)
    }
}
