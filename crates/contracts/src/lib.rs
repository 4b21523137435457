//! Общие типы чата WellBot: модель сообщений, DTO обмена с бэкендом,
//! ошибки и состояние сессии. Без зависимостей от браузера.

pub mod domain;
