//! WellBot Chat - View Component

use super::view_model::WellbotChatVm;
use crate::shared::config::{load_config, AppConfig};
use crate::shared::icons::icon;
use contracts::domain::a001_wellbot_chat::aggregate::{ChatMessage, DeliveryStatus};
use contracts::domain::a001_wellbot_chat::dto::{attachment_accept_attr, is_supported_attachment};
use leptos::prelude::*;
use thaw::*;

#[component]
#[allow(non_snake_case)]
pub fn WellbotChat() -> impl IntoView {
    let config = use_context::<AppConfig>().unwrap_or_else(load_config);
    let vm = WellbotChatVm::new(&config);
    let messages_container_ref = NodeRef::<leptos::html::Div>::new();
    let file_input_ref = NodeRef::<leptos::html::Input>::new();

    vm.load();

    // Прокрутка вниз при изменении списка сообщений
    Effect::new(move |_| {
        let _ = vm.message_count();
        let _ = vm.is_sending();
        if let Some(container) = messages_container_ref.get() {
            request_animation_frame(move || {
                let opts = web_sys::ScrollToOptions::new();
                opts.set_top(container.scroll_height() as f64);
                opts.set_behavior(web_sys::ScrollBehavior::Smooth);
                container.scroll_to_with_scroll_to_options(&opts);
            });
        }
    });

    let handle_send = Callback::new(move |_| vm.send());

    view! {
        <div style="height: 100%; max-width: 720px; margin: 0 auto; display: flex; flex-direction: column; padding: 20px;">
            <h1 style="font-size: 22px; font-weight: bold; margin-bottom: 16px;">"🩺 WellBot"</h1>

            // Messages area
            <div
                node_ref=messages_container_ref
                class="chat-box"
                style="flex: 1; overflow-y: auto; display: flex; flex-direction: column; gap: 12px; margin-bottom: 16px; padding: 12px; background: var(--colorNeutralBackground1); border: 1px solid var(--colorNeutralStroke2); border-radius: 8px;"
            >
                <For
                    each=move || vm.messages()
                    key=|msg| (msg.id, msg.status)
                    let:msg
                >
                    <MessageBubble msg=msg />
                </For>

                <Show when=move || vm.is_sending()>
                    <p class="typing-indicator" style="color: var(--colorNeutralForeground3); font-style: italic;">
                        "Bot is typing..."
                    </p>
                </Show>
            </div>

            // Attachment
            {move || {
                vm.attachment_name()
                    .map(|name| {
                        view! {
                            <Flex align=FlexAlign::Center style="gap: 8px; margin-bottom: 8px; font-size: 13px;">
                                {icon("attach")}
                                <span>{name}</span>
                                <button
                                    style="background: none; border: none; cursor: pointer; padding: 2px;"
                                    title="Remove attachment"
                                    disabled=move || vm.is_sending()
                                    on:click=move |_| vm.set_attachment(None)
                                >
                                    {icon("close")}
                                </button>
                            </Flex>
                        }
                    })
            }}

            <Flex style="gap: 8px; align-items: flex-end;">
                <input
                    type="file"
                    accept=attachment_accept_attr()
                    style="display: none;"
                    node_ref=file_input_ref
                    on:change=move |ev| {
                        let input: web_sys::HtmlInputElement = event_target(&ev);
                        if let Some(file) = input.files().and_then(|files| files.get(0)) {
                            if !is_supported_attachment(&file.name()) {
                                log::warn!("⚠️ Unsupported attachment type: {}", file.name());
                            }
                            vm.set_attachment(Some(file));
                        }
                        input.set_value("");
                    }
                />

                <div style="flex: 1;">
                    <Textarea
                        value=vm.draft
                        placeholder="Ask me about health, diet, and wellness..."
                        attr:style="width: 100%; min-height: 60px; max-height: 200px; resize: vertical;"
                        disabled=Signal::derive(move || vm.is_sending())
                        on:keydown=move |ev: web_sys::KeyboardEvent| {
                            if ev.key() == "Enter" && ev.ctrl_key() {
                                ev.prevent_default();
                                handle_send.run(());
                            }
                        }
                    />
                </div>

                <Button
                    appearance=ButtonAppearance::Secondary
                    disabled=Signal::derive(move || vm.is_sending())
                    on_click=move |_| {
                        if let Some(input) = file_input_ref.get() {
                            input.click();
                        }
                    }
                >
                    {icon("attach")}
                </Button>

                <Button
                    appearance=ButtonAppearance::Primary
                    disabled=Signal::derive(move || vm.is_sending())
                    on_click=move |_| handle_send.run(())
                >
                    {move || if vm.is_sending() { "⏳ Thinking..." } else { "Send" }}
                </Button>
            </Flex>
        </div>
    }
}

/// Текст сообщения: экранируется, `\n` превращается в `<br/>`
fn message_body(msg: &ChatMessage) -> impl IntoView {
    msg.text_lines()
        .map(str::to_string)
        .enumerate()
        .map(|(i, line)| {
            view! {
                {(i > 0).then(|| view! { <br/> })}
                {line}
            }
        })
        .collect_view()
}

#[component]
#[allow(non_snake_case)]
fn MessageBubble(msg: ChatMessage) -> impl IntoView {
    let is_user = msg.sender.is_user();
    let failed = is_user && msg.status == DeliveryStatus::Failed;
    let pending = msg.status == DeliveryStatus::Pending;
    let timestamp = msg.time_of_day();

    let class = if is_user {
        "message user-msg"
    } else {
        "message bot-msg"
    };
    let style = if is_user {
        "align-self: flex-end; max-width: 75%; padding: 10px 14px; border-radius: 12px; background: var(--colorBrandBackground); color: var(--colorNeutralForegroundOnBrand);"
    } else if msg.is_error_reply() {
        "align-self: flex-start; max-width: 75%; padding: 10px 14px; border-radius: 12px; background: var(--color-error-50); border: 1px solid var(--color-error-100); color: var(--color-error);"
    } else {
        "align-self: flex-start; max-width: 75%; padding: 10px 14px; border-radius: 12px; background: var(--colorNeutralBackground3);"
    };

    view! {
        <div class=class style=style>
            <p style="margin: 0; white-space: normal; word-break: break-word;">
                {message_body(&msg)}
            </p>
            <span class="timestamp" style="display: block; margin-top: 4px; font-size: 11px; opacity: 0.7;">
                {timestamp}
                {pending.then(|| " • sending")}
                {failed.then(|| " • not delivered")}
            </span>
        </div>
    }
}
