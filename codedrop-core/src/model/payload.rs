use serde::{Deserialize, Serialize};

/// Typed payload carried over the peer data channel once the link is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferPayload {
    Text {
        content: String,
    },
    File {
        name: String,
        mime_type: Option<String>,
        size: u64,
        #[serde(with = "serde_bytes")]
        content: Vec<u8>,
    },
}

impl TransferPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn file(name: impl Into<String>, mime_type: Option<String>, content: Vec<u8>) -> Self {
        Self::File {
            name: name.into(),
            mime_type,
            size: content.len() as u64,
            content,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::File { .. } => "file",
        }
    }
}
