pub mod a001_wellbot_chat;
