use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIORITY_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceTier {
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Expensive,
    #[serde(rename = "$$$$")]
    Luxury,
}

impl PriceTier {
    pub const ALL: [PriceTier; 4] = [
        PriceTier::Budget,
        PriceTier::Moderate,
        PriceTier::Expensive,
        PriceTier::Luxury,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTier::Budget => "$",
            PriceTier::Moderate => "$$",
            PriceTier::Expensive => "$$$",
            PriceTier::Luxury => "$$$$",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == raw.trim())
            .ok_or_else(|| format!("unknown price range `{raw}`"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Fields of a destination as the resource API stores them.
///
/// Latitude and longitude are private so they can only change together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DestinationFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub destination_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    location_lat: Option<f64>,
    #[serde(default)]
    location_lng: Option<f64>,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub visit_time: Option<NaiveTime>,
    #[serde(default)]
    pub price_range: Option<PriceTier>,
    #[serde(default = "default_priority_level")]
    pub priority_level: u8,
    #[serde(default)]
    pub order_index: u32,
    #[serde(default)]
    pub is_completed: bool,
}

fn default_priority_level() -> u8 {
    DEFAULT_PRIORITY_LEVEL
}

impl Default for DestinationFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            destination_type: None,
            address: None,
            location_lat: None,
            location_lng: None,
            visit_date: None,
            visit_time: None,
            price_range: None,
            priority_level: DEFAULT_PRIORITY_LEVEL,
            order_index: 0,
            is_completed: false,
        }
    }
}

impl DestinationFields {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A record holding only one half of the pair reads as having no location.
    pub fn location(&self) -> Option<Coordinates> {
        match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    pub fn set_location(&mut self, location: Option<Coordinates>) {
        self.location_lat = location.map(|c| c.lat);
        self.location_lng = location.map(|c| c.lng);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Destination {
    pub id: String,
    pub trip_id: String,
    #[serde(flatten)]
    pub fields: DestinationFields,
}
