use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    #[default]
    Vacation,
    Business,
    Weekend,
    Family,
}

impl TripType {
    pub const ALL: [TripType; 4] = [
        TripType::Vacation,
        TripType::Business,
        TripType::Weekend,
        TripType::Family,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Vacation => "vacation",
            TripType::Business => "business",
            TripType::Weekend => "weekend",
            TripType::Family => "family",
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw.trim())
            .ok_or_else(|| format!("unknown trip type `{raw}`"))
    }
}

/// Editable part of a trip, sent as-is to create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripFields {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub trip_type: TripType,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default = "default_traveler_count")]
    pub traveler_count: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub rating: Option<u8>,
}

pub const DEFAULT_TRAVELER_COUNT: u32 = 1;

fn default_traveler_count() -> u32 {
    DEFAULT_TRAVELER_COUNT
}

impl Default for TripFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            notes: None,
            start_date: None,
            end_date: None,
            country: None,
            city: None,
            trip_type: TripType::default(),
            budget: None,
            traveler_count: DEFAULT_TRAVELER_COUNT,
            image_url: None,
            is_favorite: false,
            rating: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub fields: TripFields,
}

impl Trip {
    pub fn location_text(&self) -> String {
        match (self.fields.city.as_deref(), self.fields.country.as_deref()) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(only), None) | (None, Some(only)) => only.to_string(),
            (None, None) => String::new(),
        }
    }
}
