//! WellBot Chat Window UI Module (MVVM Standard)
//!
//! Structure:
//! - model.rs: HTTP implementation of ChatApi
//! - view_model.rs: WellbotChatVm with signals over the session
//! - view.rs: Main component WellbotChat

mod model;
mod view;
mod view_model;

pub use model::HttpChatApi;
pub use view::WellbotChat;
pub use view_model::WellbotChatVm;
