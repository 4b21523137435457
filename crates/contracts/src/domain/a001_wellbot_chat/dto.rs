use super::aggregate::{ChatMessage, DeliveryStatus, Sender};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// GET: история сообщений пользователя
pub const HISTORY_PATH: &str = "/chat/history";
/// POST: отправка сообщения (multipart/form-data)
pub const SEND_PATH: &str = "/chat/";

/// Имена полей multipart-формы отправки
pub const FIELD_USER_ID: &str = "user_id";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_USER_CONDITIONS: &str = "user_conditions";
pub const FIELD_FILE: &str = "file";

/// Форматы вложений, которые бэкенд умеет читать
pub const SUPPORTED_ATTACHMENT_EXTENSIONS: &[&str] = &[".pdf", ".docx"];

/// Значение атрибута `accept` для input type=file
pub fn attachment_accept_attr() -> String {
    SUPPORTED_ATTACHMENT_EXTENSIONS.join(",")
}

/// Проверка имени файла по списку поддерживаемых расширений
pub fn is_supported_attachment(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    SUPPORTED_ATTACHMENT_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Метка времени записи истории: ISO-строка или число (мс от эпохи)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HistoryTimestamp {
    Millis(i64),
    Text(String),
}

impl HistoryTimestamp {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            HistoryTimestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            HistoryTimestamp::Text(s) => {
                let s = s.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Some(dt.with_timezone(&Utc));
                }
                // Без смещения считаем время в UTC
                ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                    .map(|naive| naive.and_utc())
            }
        }
    }
}

/// Запись истории, как её отдаёт бэкенд
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub sender: String,
    pub text: String,
    pub timestamp: HistoryTimestamp,
}

impl HistoryRecord {
    /// Преобразование в сообщение сессии; `fallback` используется при нечитаемой метке времени
    pub fn into_message(self, fallback: DateTime<Utc>) -> ChatMessage {
        let sent_at = self.timestamp.parse().unwrap_or(fallback);
        ChatMessage::new(
            Sender::from_tag(&self.sender),
            self.text,
            sent_at,
            DeliveryStatus::Delivered,
        )
    }
}

/// Ответ GET /chat/history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    pub history: Vec<HistoryRecord>,
}

impl HistoryResponse {
    pub fn into_messages(self, fallback: DateTime<Utc>) -> Vec<ChatMessage> {
        self.history
            .into_iter()
            .map(|record| record.into_message(fallback))
            .collect()
    }
}

/// Ответ POST /chat/
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
}

/// Полезная нагрузка отправки; `A` — непрозрачный дескриптор файла
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest<A> {
    pub user_id: String,
    pub message: String,
    pub user_conditions: Vec<String>,
    pub attachment: Option<A>,
}

impl<A> SendRequest<A> {
    /// Текстовые поля формы в порядке добавления
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            (FIELD_USER_ID, self.user_id.as_str()),
            (FIELD_MESSAGE, self.message.as_str()),
        ];
        for condition in &self.user_conditions {
            fields.push((FIELD_USER_CONDITIONS, condition.as_str()));
        }
        fields
    }
}
