use crate::domain::a001_wellbot_chat::ui::chat_window::WellbotChat;
use crate::shared::config::load_config;
use leptos::prelude::*;
use thaw::ConfigProvider;

#[component]
pub fn App() -> impl IntoView {
    // Provide the resolved configuration to the whole app via context.
    provide_context(load_config());

    view! {
        <ConfigProvider>
            <WellbotChat />
        </ConfigProvider>
    }
}
