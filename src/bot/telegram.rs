//! Minimal Telegram Bot API client.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use wreq::Client;
use wreq::header::CONTENT_TYPE;
use wreq::header::HeaderMap;
use wreq::header::HeaderValue;
use wreq::header::USER_AGENT;

use crate::bot::error::BotError;
use crate::entity::RecipientId;
use crate::notifier::Menu;
use crate::notifier::Notifier;
use crate::notifier::NotifyError;
use crate::notifier::OutgoingMessage;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Seconds a `getUpdates` call may wait for new updates.
pub const LONG_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize, Clone, Debug)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// The command name of a `/command@bot args` message, without the slash.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?.strip_prefix('/')?;
        let word = text.split_whitespace().next()?;
        word.split('@').next().filter(|c| !c.is_empty())
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{username}"),
            _ => match &self.last_name {
                Some(last) => format!("{} {}", self.first_name, last),
                None => self.first_name.clone(),
            },
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    pub api_url: String,
    token: String,
    client: Client,
}

impl TelegramClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, BotError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("walkout-bot/0.1"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            // Must outlast a long poll.
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 15))
            .build()?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: Value) -> Result<T, BotError> {
        debug!("Calling Telegram method {method}");
        let response = self
            .client
            .post(self.method_url(method))
            .body(payload.to_string())
            .send()
            .await?;
        let body = response.text().await?;
        let resp: ApiResponse<T> = serde_json::from_str(&body)?;

        match (resp.ok, resp.result) {
            (true, Some(result)) => Ok(result),
            (_, _) => Err(BotError::ApiError {
                description: resp
                    .description
                    .unwrap_or_else(|| format!("`{method}` returned no result")),
            }),
        }
    }

    /// Name of the bot account.
    pub async fn get_me(&self) -> Result<User, BotError> {
        self.call("getMe", json!({})).await
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, BotError> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", payload).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        message: &OutgoingMessage,
    ) -> Result<(), BotError> {
        let _: Value = self
            .call("sendMessage", send_message_payload(chat_id, message))
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), BotError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                json!({ "callback_query_id": callback_query_id }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(
        &self,
        recipient: RecipientId,
        message: OutgoingMessage,
    ) -> Result<(), NotifyError> {
        self.send_message(recipient, &message)
            .await
            .map_err(|e| match e {
                BotError::ApiError { description } => NotifyError::Rejected {
                    recipient,
                    description,
                },
                e => NotifyError::DeliveryFailed {
                    recipient,
                    source: Box::new(e),
                },
            })
    }
}

/// Body of a `sendMessage` call.
pub fn send_message_payload(chat_id: i64, message: &OutgoingMessage) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": message.text,
    });
    if message.markdown {
        payload["parse_mode"] = json!("Markdown");
    }
    if let Some(menu) = &message.menu {
        payload["reply_markup"] = inline_keyboard(menu);
    }
    payload
}

fn inline_keyboard(menu: &Menu) -> Value {
    let rows: Vec<Vec<Value>> = menu
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.text, "callback_data": b.token }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}
