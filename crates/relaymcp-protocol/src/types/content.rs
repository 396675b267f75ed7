//! Content blocks
//!
//! The tagged content union used in tool results, prompt messages, and
//! sampling messages.

use serde::{Deserialize, Serialize};

/// A single block of content, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text
    Text {
        /// The text body
        text: String,
    },
    /// Base64-encoded image
    Image {
        /// Base64 payload
        data: String,
        /// MIME type, e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Base64-encoded audio
    Audio {
        /// Base64 payload
        data: String,
        /// MIME type, e.g. `audio/wav`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource
    Resource {
        /// The resource contents
        resource: ResourceContents,
    },
}

impl Content {
    /// Convenience constructor for a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text body, if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Contents of a resource, textual or binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceContents {
    /// UTF-8 text resource
    Text {
        /// Resource URI
        uri: String,
        /// MIME type
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// The text
        text: String,
    },
    /// Binary resource
    Blob {
        /// Resource URI
        uri: String,
        /// MIME type
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Base64-encoded bytes
        blob: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_tagging() {
        let text = Content::text("hi");
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            json!({"type": "text", "text": "hi"})
        );

        let img: Content = serde_json::from_value(json!({
            "type": "image", "data": "aGk=", "mimeType": "image/png"
        }))
        .unwrap();
        assert!(matches!(img, Content::Image { .. }));
    }

    #[test]
    fn resource_contents_variants() {
        let text: ResourceContents = serde_json::from_value(json!({
            "uri": "file:///a.txt", "text": "body"
        }))
        .unwrap();
        assert!(matches!(text, ResourceContents::Text { .. }));

        let blob: ResourceContents = serde_json::from_value(json!({
            "uri": "file:///a.bin", "blob": "aGk="
        }))
        .unwrap();
        assert!(matches!(blob, ResourceContents::Blob { .. }));
    }
}
