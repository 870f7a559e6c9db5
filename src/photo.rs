use serde::{Deserialize, Serialize};

/// One photo entry as returned by the photo API.
///
/// Field names follow the API payload so the same shape is used for decoding
/// responses and for the persisted favorites list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub urls: PhotoUrls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUrls {
    pub regular: String,
}

impl PhotoRecord {
    pub fn new(id: impl Into<String>, regular_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            urls: PhotoUrls {
                regular: regular_url.into(),
            },
            description: None,
            alt_description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_alt_description(mut self, alt: impl Into<String>) -> Self {
        self.alt_description = Some(alt.into());
        self
    }

    /// Text used as the image's alternative text, falling back to a fixed label.
    pub fn caption(&self) -> &str {
        self.alt_description
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("pin")
    }
}
