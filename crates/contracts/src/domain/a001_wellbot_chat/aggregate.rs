use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Текст ответа бота при любой ошибке отправки
pub const ERROR_REPLY_TEXT: &str = "❌ Error connecting to server.";

/// ID сообщения в рамках сессии (ключ для рендеринга)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessageId(pub Uuid);

impl ChatMessageId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Автор сообщения
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Нормализация тега с бэкенда: "user" -> User, всё остальное -> Bot
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "user" => Sender::User,
            _ => Sender::Bot,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }
}

/// Статус доставки сообщения
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    /// Локальное эхо, ответ сервера ещё не получен
    Pending,
    Delivered,
    Failed,
}

/// Сообщение чата
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: String, sent_at: DateTime<Utc>, status: DeliveryStatus) -> Self {
        Self {
            id: ChatMessageId::new_v4(),
            sender,
            text,
            sent_at,
            status,
        }
    }

    /// Оптимистичное эхо сообщения пользователя
    pub fn user_pending(text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self::new(Sender::User, text.into(), sent_at, DeliveryStatus::Pending)
    }

    /// Ответ бота
    pub fn bot(text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self::new(Sender::Bot, text.into(), sent_at, DeliveryStatus::Delivered)
    }

    /// Синтетический ответ бота при ошибке отправки
    pub fn bot_error(sent_at: DateTime<Utc>) -> Self {
        Self::bot(ERROR_REPLY_TEXT, sent_at)
    }

    pub fn is_error_reply(&self) -> bool {
        self.sender == Sender::Bot && self.text == ERROR_REPLY_TEXT
    }

    /// Строки текста для рендеринга с переносами (`\n` -> `<br/>`)
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Время отправки в заданной таймзоне, формат HH:MM:SS
    pub fn time_of_day_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.sent_at.with_timezone(tz).format("%H:%M:%S").to_string()
    }

    /// Время отправки в локальной таймзоне
    pub fn time_of_day(&self) -> String {
        self.time_of_day_in(&Local)
    }
}
