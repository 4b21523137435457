//! Состояние сессии чата
//!
//! Единственный владелец списка сообщений, черновика и вложения.
//! Асинхронные операции (загрузка истории, отправка) разбиты на две фазы:
//! `begin_*` выдаёт тикет, `apply_*`/`complete_*` принимает результат.
//! Результат с устаревшим тикетом игнорируется.

use super::aggregate::{ChatMessage, ChatMessageId, DeliveryStatus};
use super::dto::SendRequest;
use super::error::ChatError;
use chrono::{DateTime, Utc};

/// Что делать с вложением после успешной отправки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentPolicy {
    #[default]
    ClearOnSuccess,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Sending,
}

/// Тикет загрузки истории
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTicket {
    id: u64,
    /// Сколько сообщений было в сессии на момент старта загрузки
    base_len: usize,
    /// Эхо отправки, которая шла в момент старта загрузки
    pending_echo: Option<ChatMessageId>,
}

impl HistoryTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// История заменила сообщения сессии
    Replaced { loaded: usize },
    /// За время загрузки были добавлены локальные сообщения, они сохранены после истории
    Merged { loaded: usize, kept_local: usize },
    /// Загрузка завершилась ошибкой, сообщения не тронуты
    Failed,
    /// Тикет устарел
    Stale,
}

/// Тикет отправки
#[derive(Debug, Clone, PartialEq)]
pub struct SendTicket<A> {
    pub id: u64,
    pub echo_id: ChatMessageId,
    pub request: SendRequest<A>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightSend {
    ticket_id: u64,
    echo_id: ChatMessageId,
}

#[derive(Debug, Clone)]
pub struct ChatSession<A> {
    user_id: String,
    user_conditions: Vec<String>,
    messages: Vec<ChatMessage>,
    draft: String,
    attachment: Option<A>,
    in_flight: Option<InFlightSend>,
    pending_history: Option<u64>,
    attachment_policy: AttachmentPolicy,
    next_ticket: u64,
}

impl<A: Clone> ChatSession<A> {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_conditions: Vec::new(),
            messages: Vec::new(),
            draft: String::new(),
            attachment: None,
            in_flight: None,
            pending_history: None,
            attachment_policy: AttachmentPolicy::default(),
            next_ticket: 1,
        }
    }

    pub fn with_user_conditions(mut self, conditions: Vec<String>) -> Self {
        self.user_conditions = conditions;
        self
    }

    pub fn with_attachment_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.attachment_policy = policy;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn attachment(&self) -> Option<&A> {
        self.attachment.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_in_flight() {
            SessionPhase::Sending
        } else {
            SessionPhase::Idle
        }
    }

    /// Черновик годится для отправки
    pub fn can_send(&self) -> bool {
        !self.is_in_flight() && !self.draft.trim().is_empty()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn set_attachment(&mut self, attachment: Option<A>) {
        self.attachment = attachment;
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    fn issue_ticket(&mut self) -> u64 {
        let id = self.next_ticket;
        self.next_ticket += 1;
        id
    }

    // ---- History -------------------------------------------------------

    pub fn begin_history_load(&mut self) -> HistoryTicket {
        let id = self.issue_ticket();
        self.pending_history = Some(id);
        HistoryTicket {
            id,
            base_len: self.messages.len(),
            pending_echo: self.in_flight.map(|f| f.echo_id),
        }
    }

    pub fn apply_history(
        &mut self,
        ticket: HistoryTicket,
        history: Vec<ChatMessage>,
    ) -> HistoryOutcome {
        if self.pending_history != Some(ticket.id) {
            return HistoryOutcome::Stale;
        }
        self.pending_history = None;

        let loaded = history.len();
        let current_echo = self.in_flight.map(|f| f.echo_id);
        let tail = self
            .messages
            .split_off(ticket.base_len.min(self.messages.len()));

        // Эхо неподтверждённой отправки не откатывается, даже если оно старше загрузки
        let mut local: Vec<ChatMessage> = std::mem::take(&mut self.messages)
            .into_iter()
            .filter(|m| Some(m.id) == ticket.pending_echo || Some(m.id) == current_echo)
            .collect();
        local.extend(tail);
        let kept_local = local.len();

        self.messages = history;
        self.messages.extend(local);

        if kept_local == 0 {
            HistoryOutcome::Replaced { loaded }
        } else {
            HistoryOutcome::Merged { loaded, kept_local }
        }
    }

    pub fn fail_history(&mut self, ticket: HistoryTicket) -> HistoryOutcome {
        if self.pending_history != Some(ticket.id) {
            return HistoryOutcome::Stale;
        }
        self.pending_history = None;
        HistoryOutcome::Failed
    }

    // ---- Send ----------------------------------------------------------

    /// Старт отправки. `None`, если черновик пуст или отправка уже идёт.
    pub fn begin_send(&mut self, now: DateTime<Utc>) -> Option<SendTicket<A>> {
        if !self.can_send() {
            return None;
        }

        let echo = ChatMessage::user_pending(self.draft.clone(), now);
        let echo_id = echo.id;
        self.messages.push(echo);

        let id = self.issue_ticket();
        self.in_flight = Some(InFlightSend {
            ticket_id: id,
            echo_id,
        });

        Some(SendTicket {
            id,
            echo_id,
            request: SendRequest {
                user_id: self.user_id.clone(),
                message: self.draft.clone(),
                user_conditions: self.user_conditions.clone(),
                attachment: self.attachment.clone(),
            },
        })
    }

    pub fn complete_send(
        &mut self,
        ticket_id: u64,
        result: Result<String, ChatError>,
        now: DateTime<Utc>,
    ) -> SendOutcome {
        let in_flight = match self.in_flight {
            Some(f) if f.ticket_id == ticket_id => f,
            _ => return SendOutcome::Stale,
        };

        let (status, reply, outcome) = match result {
            Ok(text) => (
                DeliveryStatus::Delivered,
                ChatMessage::bot(text, now),
                SendOutcome::Delivered,
            ),
            Err(_) => (
                DeliveryStatus::Failed,
                ChatMessage::bot_error(now),
                SendOutcome::Failed,
            ),
        };

        if let Some(echo) = self.messages.iter_mut().find(|m| m.id == in_flight.echo_id) {
            echo.status = status;
        }
        self.messages.push(reply);

        self.draft.clear();
        self.in_flight = None;
        if outcome == SendOutcome::Delivered
            && self.attachment_policy == AttachmentPolicy::ClearOnSuccess
        {
            self.attachment = None;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_wellbot_chat::aggregate::{Sender, ERROR_REPLY_TEXT};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn session() -> ChatSession<String> {
        ChatSession::new("user123")
    }

    #[test]
    fn test_send_hello_scenario() {
        let mut s = session();
        s.set_draft("Hello");

        let ticket = s.begin_send(now()).unwrap();
        assert!(s.is_in_flight());
        assert_eq!(s.phase(), SessionPhase::Sending);
        assert_eq!(ticket.request.user_id, "user123");
        assert_eq!(ticket.request.message, "Hello");
        assert_eq!(ticket.request.attachment, None);
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].status, DeliveryStatus::Pending);

        let outcome = s.complete_send(ticket.id, Ok("Hi there".into()), now());
        assert_eq!(outcome, SendOutcome::Delivered);

        let msgs = s.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].sender, Sender::User);
        assert_eq!(msgs[0].text, "Hello");
        assert_eq!(msgs[0].status, DeliveryStatus::Delivered);
        assert_eq!(msgs[1].sender, Sender::Bot);
        assert_eq!(msgs[1].text, "Hi there");
        assert_eq!(s.draft(), "");
        assert!(!s.is_in_flight());
        assert_eq!(s.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_blank_draft_is_noop() {
        for draft in ["", "   ", "\n\t "] {
            let mut s = session();
            s.set_draft(draft);
            assert!(s.begin_send(now()).is_none());
            assert!(s.messages().is_empty());
            assert!(!s.is_in_flight());
            assert_eq!(s.draft(), draft);
        }
    }

    #[test]
    fn test_message_sent_untrimmed() {
        let mut s = session();
        s.set_draft("  line one\nline two  ");
        let ticket = s.begin_send(now()).unwrap();
        assert_eq!(ticket.request.message, "  line one\nline two  ");
        assert_eq!(s.messages()[0].text, "  line one\nline two  ");
    }

    #[test]
    fn test_failure_appends_error_reply() {
        let mut s = session();
        s.set_draft("Hello");
        let ticket = s.begin_send(now()).unwrap();

        let outcome = s.complete_send(ticket.id, Err(ChatError::Status(500)), now());
        assert_eq!(outcome, SendOutcome::Failed);

        let msgs = s.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].status, DeliveryStatus::Failed);
        assert_eq!(msgs[1].sender, Sender::Bot);
        assert_eq!(msgs[1].text, ERROR_REPLY_TEXT);
        assert_eq!(s.draft(), "");
        assert!(!s.is_in_flight());
    }

    #[test]
    fn test_second_send_rejected_while_in_flight() {
        let mut s = session();
        s.set_draft("first");
        let ticket = s.begin_send(now()).unwrap();

        s.set_draft("second");
        assert!(s.begin_send(now()).is_none());
        assert_eq!(s.messages().len(), 1);

        s.complete_send(ticket.id, Ok("ok".into()), now());
        assert_eq!(s.messages().len(), 2);
    }

    #[test]
    fn test_stale_send_completion_ignored() {
        let mut s = session();
        s.set_draft("Hello");
        let ticket = s.begin_send(now()).unwrap();

        assert_eq!(
            s.complete_send(ticket.id + 100, Ok("late".into()), now()),
            SendOutcome::Stale
        );
        assert!(s.is_in_flight());
        assert_eq!(s.messages().len(), 1);

        s.complete_send(ticket.id, Ok("ok".into()), now());
        // повторное завершение того же тикета
        assert_eq!(
            s.complete_send(ticket.id, Ok("again".into()), now()),
            SendOutcome::Stale
        );
        assert_eq!(s.messages().len(), 2);
    }

    #[test]
    fn test_attachment_cleared_after_success() {
        let mut s = session();
        s.set_attachment(Some("report.pdf".to_string()));
        s.set_draft("see report");

        let ticket = s.begin_send(now()).unwrap();
        assert_eq!(ticket.request.attachment.as_deref(), Some("report.pdf"));

        s.complete_send(ticket.id, Ok("read it".into()), now());
        assert!(s.attachment().is_none());
    }

    #[test]
    fn test_attachment_kept_after_failure() {
        let mut s = session();
        s.set_attachment(Some("report.pdf".to_string()));
        s.set_draft("see report");
        let ticket = s.begin_send(now()).unwrap();
        s.complete_send(ticket.id, Err(ChatError::Network("down".into())), now());
        assert_eq!(s.attachment().map(String::as_str), Some("report.pdf"));
    }

    #[test]
    fn test_keep_policy_persists_attachment() {
        let mut s = session().with_attachment_policy(AttachmentPolicy::Keep);
        s.set_attachment(Some("report.pdf".to_string()));
        s.set_draft("one");
        let ticket = s.begin_send(now()).unwrap();
        s.complete_send(ticket.id, Ok("ok".into()), now());
        assert!(s.attachment().is_some());
    }

    #[test]
    fn test_user_conditions_in_request() {
        let mut s = session().with_user_conditions(vec!["diabetes".into()]);
        s.set_draft("diet?");
        let ticket = s.begin_send(now()).unwrap();
        assert_eq!(ticket.request.user_conditions, vec!["diabetes".to_string()]);
    }

    fn history(texts: &[(&str, Sender)]) -> Vec<ChatMessage> {
        texts
            .iter()
            .map(|(t, sender)| {
                ChatMessage::new(*sender, t.to_string(), now(), DeliveryStatus::Delivered)
            })
            .collect()
    }

    #[test]
    fn test_history_replaces_in_order() {
        let mut s = session();
        let ticket = s.begin_history_load();
        let outcome = s.apply_history(
            ticket,
            history(&[("q1", Sender::User), ("a1", Sender::Bot), ("q2", Sender::User)]),
        );
        assert_eq!(outcome, HistoryOutcome::Replaced { loaded: 3 });
        let texts: Vec<&str> = s.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1", "q2"]);
    }

    #[test]
    fn test_history_failure_leaves_empty() {
        let mut s = session();
        let ticket = s.begin_history_load();
        assert_eq!(s.fail_history(ticket), HistoryOutcome::Failed);
        assert!(s.messages().is_empty());
        assert!(!s.is_in_flight());
    }

    #[test]
    fn test_history_arriving_after_local_send_is_merged() {
        let mut s = session();
        let ticket = s.begin_history_load();

        s.set_draft("Hello");
        let send = s.begin_send(now()).unwrap();
        s.complete_send(send.id, Ok("Hi there".into()), now());

        let outcome = s.apply_history(ticket, history(&[("old", Sender::User)]));
        assert_eq!(
            outcome,
            HistoryOutcome::Merged {
                loaded: 1,
                kept_local: 2
            }
        );
        let texts: Vec<&str> = s.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["old", "Hello", "Hi there"]);
    }

    #[test]
    fn test_older_history_load_is_stale() {
        let mut s = session();
        let first = s.begin_history_load();
        let second = s.begin_history_load();

        assert_eq!(
            s.apply_history(first, history(&[("old", Sender::Bot)])),
            HistoryOutcome::Stale
        );
        assert!(s.messages().is_empty());
        assert_eq!(
            s.apply_history(second, history(&[("new", Sender::Bot)])),
            HistoryOutcome::Replaced { loaded: 1 }
        );
        assert_eq!(s.fail_history(second), HistoryOutcome::Stale);
    }

    #[test]
    fn test_history_load_started_during_send_keeps_echo() {
        let mut s = session();
        s.set_draft("Hello");
        let send = s.begin_send(now()).unwrap();
        let load = s.begin_history_load();

        s.complete_send(send.id, Ok("Hi there".into()), now());
        let outcome = s.apply_history(load, history(&[("old", Sender::User)]));
        assert_eq!(
            outcome,
            HistoryOutcome::Merged {
                loaded: 1,
                kept_local: 2
            }
        );

        let texts: Vec<&str> = s.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["old", "Hello", "Hi there"]);
        assert_eq!(s.messages()[1].status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_history_applied_while_send_in_flight_keeps_echo() {
        let mut s = session();
        s.set_draft("Hello");
        let send = s.begin_send(now()).unwrap();
        let load = s.begin_history_load();

        s.apply_history(load, history(&[("old", Sender::Bot)]));
        let texts: Vec<&str> = s.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["old", "Hello"]);

        assert_eq!(
            s.complete_send(send.id, Err(ChatError::Timeout(1000)), now()),
            SendOutcome::Failed
        );
        assert_eq!(s.messages()[1].status, DeliveryStatus::Failed);
        assert_eq!(s.messages()[2].text, ERROR_REPLY_TEXT);
    }

    #[test]
    fn test_history_reload_drops_settled_messages() {
        let mut s = session();
        s.set_draft("Hello");
        let send = s.begin_send(now()).unwrap();
        s.complete_send(send.id, Ok("Hi there".into()), now());

        let load = s.begin_history_load();
        let outcome = s.apply_history(
            load,
            history(&[("Hello", Sender::User), ("Hi there", Sender::Bot)]),
        );
        assert_eq!(outcome, HistoryOutcome::Replaced { loaded: 2 });
        assert_eq!(s.messages().len(), 2);
    }
}
