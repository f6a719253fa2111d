use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Photo {
    pub id: String,
    pub trip_id: String,
    #[serde(default)]
    pub destination_id: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

impl Photo {
    pub fn caption_text(&self) -> &str {
        self.caption.as_deref().unwrap_or("")
    }
}
