//! WellBot Chat - Model (API functions)

use crate::domain::a001_wellbot_chat::service::ChatApi;
use crate::shared::api_utils::{api_url, api_url_with_query};
use crate::shared::config::ServerConfig;
use async_trait::async_trait;
use contracts::domain::a001_wellbot_chat::dto::{
    ChatReply, HistoryResponse, SendRequest, FIELD_FILE, FIELD_USER_ID, HISTORY_PATH, SEND_PATH,
};
use contracts::domain::a001_wellbot_chat::error::ChatError;
use gloo_net::http::{Request, Response};
use gloo_timers::callback::Timeout;
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::rc::Rc;
use web_sys::{AbortController, FormData};

/// HTTP implementation of [`ChatApi`] over `fetch`
#[derive(Clone)]
pub struct HttpChatApi {
    config: ServerConfig,
}

impl HttpChatApi {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl ChatApi for HttpChatApi {
    type Attachment = web_sys::File;

    async fn fetch_history(&self, user_id: &str) -> Result<HistoryResponse, ChatError> {
        let url = api_url_with_query(&self.config.api_base, HISTORY_PATH, FIELD_USER_ID, user_id);
        let timeout_ms = self.config.request_timeout_ms;

        fetch_json(timeout_ms, |signal| {
            Request::get(&url)
                .header("Accept", "application/json")
                .abort_signal(signal)
                .build()
        })
        .await
    }

    async fn post_message(
        &self,
        request: SendRequest<web_sys::File>,
    ) -> Result<ChatReply, ChatError> {
        let url = api_url(&self.config.api_base, SEND_PATH);
        let timeout_ms = self.config.request_timeout_ms;
        let form_data = build_form_data(&request)?;

        // Content-Type с boundary выставляет браузер
        fetch_json(timeout_ms, |signal| {
            Request::post(&url)
                .abort_signal(signal)
                .body(form_data)
        })
        .await
    }
}

fn build_form_data(request: &SendRequest<web_sys::File>) -> Result<FormData, ChatError> {
    let form_data = FormData::new().map_err(|e| ChatError::Request(format!("{e:?}")))?;

    for (name, value) in request.text_fields() {
        form_data
            .append_with_str(name, value)
            .map_err(|e| ChatError::Request(format!("{e:?}")))?;
    }

    if let Some(file) = &request.attachment {
        form_data
            .append_with_blob_and_filename(FIELD_FILE, file, &file.name())
            .map_err(|e| ChatError::Request(format!("{e:?}")))?;
    }

    Ok(form_data)
}

/// Send a request and decode its JSON body, aborting after `timeout_ms` (0 = no timeout)
///
/// The timeout covers both the response headers and the body.
async fn fetch_json<T, F>(timeout_ms: u32, build: F) -> Result<T, ChatError>
where
    T: DeserializeOwned,
    F: FnOnce(Option<&web_sys::AbortSignal>) -> Result<Request, gloo_net::Error>,
{
    if timeout_ms == 0 {
        let request = build(None).map_err(|e| ChatError::Request(e.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        return decode_json(response).await;
    }

    let controller = AbortController::new().map_err(|e| ChatError::Request(format!("{e:?}")))?;
    let signal = controller.signal();
    let request = build(Some(&signal)).map_err(|e| ChatError::Request(e.to_string()))?;

    let timed_out = Rc::new(Cell::new(false));
    let timer = {
        let timed_out = timed_out.clone();
        Timeout::new(timeout_ms, move || {
            timed_out.set(true);
            controller.abort();
        })
    };

    let result = match request.send().await {
        Ok(response) => decode_json(response).await,
        Err(e) => Err(ChatError::Network(e.to_string())),
    };
    // Таймер отменяется при drop
    drop(timer);

    classify_timeout(result, timed_out.get(), timeout_ms)
}

/// Any failure after the abort timer fired is reported as a timeout
fn classify_timeout<T>(
    result: Result<T, ChatError>,
    timed_out: bool,
    timeout_ms: u32,
) -> Result<T, ChatError> {
    match result {
        Err(ChatError::Network(_)) | Err(ChatError::Decode(_)) if timed_out => {
            Err(ChatError::Timeout(timeout_ms))
        }
        other => other,
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ChatError> {
    if !response.ok() {
        return Err(ChatError::Status(response.status()));
    }

    let text = response
        .text()
        .await
        .map_err(|e| ChatError::Decode(format!("Failed to read response: {}", e)))?;

    serde_json::from_str::<T>(&text).map_err(|e| ChatError::Decode(e.to_string()))
}
