pub mod chat_window;
