use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role/type tag of a transcript line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Assistant,
    System,
    #[serde(untagged)]
    Other(String),
}

impl MessageType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "user" => MessageType::User,
            "assistant" => MessageType::Assistant,
            "system" => MessageType::System,
            other => MessageType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageType::User => "user",
            MessageType::Assistant => "assistant",
            MessageType::System => "system",
            MessageType::Other(tag) => tag,
        }
    }
}

/// One typed block of a structured message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
    Image {
        #[serde(default)]
        source: Value,
    },
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Unknown => "unknown",
        }
    }
}

/// `message.content`: either a plain string or a sequence of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Iterate over the text payloads, in order
    pub fn texts(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            MessageContent::Text(text) => Box::new(std::iter::once(text.as_str())),
            MessageContent::Blocks(blocks) => Box::new(blocks.iter().filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })),
        }
    }

    /// All text payloads joined by newlines (used for display)
    pub fn plain_text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }
}

/// A parsed transcript line carrying a message identity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub uuid: String,
    pub parent_uuid: Option<String>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub role: Option<String>,
    pub content: Option<MessageContent>,
    pub is_meta: bool,
    pub is_sidechain: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub git_branch: Option<String>,
    /// 1-based physical line number in the transcript
    pub line_number: usize,
    /// The original line, without its terminator
    #[serde(skip)]
    pub raw: String,
    /// Fields this engine does not interpret
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl MessageRecord {
    pub fn is_user(&self) -> bool {
        self.message_type == MessageType::User
    }

    pub fn is_root(&self) -> bool {
        self.parent_uuid.is_none()
    }
}
