use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A plain text message sent to a chat the bot is in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub chat_id: i64,
    pub text: String,
    pub message_id: i64,
    pub from_id: i64,
    pub from_username: String,
}

/// An inline-button press; `command` is the button's callback data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub callback_id: String,
    pub chat_id: i64,
    pub command: String,
    pub message_id: i64,
    pub from_id: i64,
    pub from_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateBody {
    CallbackQuery(CallbackQuery),
    Message(Message),
}

impl UpdateBody {
    pub fn chat_id(&self) -> i64 {
        match self {
            UpdateBody::CallbackQuery(cb) => cb.chat_id,
            UpdateBody::Message(msg) => msg.chat_id,
        }
    }
}

/// Normalized inbound event, as published to the shard queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub date: i64,
    pub body: UpdateBody,
}

/// Normalize one raw getUpdates entry. `None` means the update does not
/// carry the fields we need (edited messages, stickers, truncated payloads);
/// the caller still advances its offset past it.
pub fn parse_update(raw: &Value) -> Option<Update> {
    let update_id = raw.get("update_id")?.as_i64()?;

    if let Some(cq) = raw.get("callback_query") {
        let message = cq.get("message")?;
        return Some(Update {
            update_id,
            date: message.get("date")?.as_i64()?,
            body: UpdateBody::CallbackQuery(CallbackQuery {
                callback_id: cq.get("id")?.as_str()?.to_string(),
                chat_id: message.get("chat")?.get("id")?.as_i64()?,
                command: cq.get("data")?.as_str()?.to_string(),
                message_id: message.get("message_id")?.as_i64()?,
                from_id: cq.get("from")?.get("id")?.as_i64()?,
                from_username: sender_name(cq.get("from")?)?,
            }),
        });
    }

    let msg = raw.get("message")?;
    Some(Update {
        update_id,
        date: msg.get("date")?.as_i64()?,
        body: UpdateBody::Message(Message {
            chat_id: msg.get("chat")?.get("id")?.as_i64()?,
            text: msg.get("text")?.as_str()?.to_string(),
            message_id: msg.get("message_id")?.as_i64()?,
            from_id: msg.get("from")?.get("id")?.as_i64()?,
            from_username: sender_name(msg.get("from")?)?,
        }),
    })
}

// Not everyone sets an @username; fall back to the first name.
fn sender_name(from: &Value) -> Option<String> {
    from.get("username")
        .and_then(Value::as_str)
        .or_else(|| from.get("first_name").and_then(Value::as_str))
        .map(str::to_string)
}
