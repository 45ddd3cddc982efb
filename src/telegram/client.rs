use serde_json::{Value, json};

use crate::error::BotError;

const API_HOST: &str = "https://api.telegram.org/bot";

/// Outbound chat-API client. One instance (and thus one connection pool)
/// per process.
#[derive(Clone)]
pub struct TgClient {
    http: reqwest::Client,
    base: String,
}

impl TgClient {
    pub fn new(token: &str) -> Self {
        TgClient {
            http: reqwest::Client::new(),
            base: format!("{API_HOST}{token}"),
        }
    }

    /// Point the client at a different API host (tests, local stubs).
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        TgClient {
            http: reqwest::Client::new(),
            base: format!("{base_url}/bot{token}"),
        }
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value, BotError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await?;
        let data: Value = response.json().await?;
        if !data.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(BotError::Api(description));
        }
        Ok(data)
    }

    /// Long poll; blocks server-side for up to `timeout` seconds.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<Vec<Value>, BotError> {
        let mut body = json!({
            "timeout": timeout,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let data = self.call("getUpdates", &body).await?;
        Ok(data
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        self.call("sendMessage", &json!({"chat_id": chat_id, "text": text}))
            .await?;
        Ok(())
    }

    pub async fn send_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Value,
    ) -> Result<(), BotError> {
        self.call(
            "sendMessage",
            &json!({"chat_id": chat_id, "text": text, "reply_markup": keyboard}),
        )
        .await?;
        Ok(())
    }

    /// Answering too late is normal (the button's query expires in seconds);
    /// that case is swallowed at warn so handlers keep going.
    pub async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), BotError> {
        let body = json!({"callback_query_id": callback_id, "text": text});
        match self.call("answerCallbackQuery", &body).await {
            Ok(_) => Ok(()),
            Err(BotError::Api(description))
                if description.contains("query is too old")
                    || description.contains("QUERY_ID_INVALID") =>
            {
                tracing::warn!("callback query expired: {description}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

pub fn start_keyboard() -> Value {
    json!({"inline_keyboard": [
        [{"text": "Начать игру", "callback_data": "/start"}],
    ]})
}

pub fn join_keyboard() -> Value {
    json!({"inline_keyboard": [
        [{"text": "Присоединиться", "callback_data": "/join"}],
    ]})
}

pub fn turn_keyboard() -> Value {
    json!({"inline_keyboard": [
        [{"text": "Покинуть игру", "callback_data": "/leave_game"}],
        [{"text": "Назвать букву", "callback_data": "/say_letter"}],
        [{"text": "Назвать слово", "callback_data": "/say_word"}],
    ]})
}
