use openvibe_api::{AuthorType, Message, MessageId};

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const AGENT_AVATAR_LABEL: &str = "AI";
pub const AGENT_BADGE: &str = "BOT";

const MINUTE_SECONDS: u64 = 60;
const HOUR_SECONDS: u64 = 60 * MINUTE_SECONDS;
const DAY_SECONDS: u64 = 24 * HOUR_SECONDS;

/// Read-only presentation of one cached message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: MessageId,
    pub display_name: String,
    pub avatar_label: String,
    pub badge: Option<&'static str>,
    pub is_agent: bool,
    pub time_label: String,
    pub content: String,
}

impl MessageRow {
    pub fn from_message(message: &Message) -> Self {
        let display_name = message
            .author_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let is_agent = message.author_type == AuthorType::Agent;
        let avatar_label = if is_agent {
            AGENT_AVATAR_LABEL.to_string()
        } else {
            display_name
                .chars()
                .next()
                .map(|initial| initial.to_uppercase().collect())
                .unwrap_or_default()
        };

        Self {
            id: message.id,
            display_name,
            avatar_label,
            badge: is_agent.then_some(AGENT_BADGE),
            is_agent,
            time_label: time_label(message.created_at_unix_seconds),
            content: message.content.clone(),
        }
    }
}

/// `HH:MM` in UTC. Elapsed-time arithmetic avoids pulling in timezone data.
pub fn time_label(unix_seconds: u64) -> String {
    let seconds_of_day = unix_seconds % DAY_SECONDS;
    format!(
        "{:02}:{:02}",
        seconds_of_day / HOUR_SECONDS,
        (seconds_of_day % HOUR_SECONDS) / MINUTE_SECONDS
    )
}

pub fn rows(messages: &[Message]) -> Vec<MessageRow> {
    messages.iter().map(MessageRow::from_message).collect()
}
