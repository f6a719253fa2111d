use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::{models::trip::Trip, planner::status::TripSchedule};

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_default()
}

pub fn input_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: &str, label: &str, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected,
        }
    }
}

/// What a trip card shows.
#[derive(Clone)]
pub struct TripCard {
    pub id: String,
    pub title: String,
    pub location: String,
    pub trip_type: String,
    pub dates: String,
    pub status: String,
    pub days_info: String,
    pub duration: String,
    pub is_favorite: bool,
    pub has_image: bool,
    pub image_url: String,
}

impl TripCard {
    pub fn from_trip(now: NaiveDateTime, trip: &Trip) -> Self {
        let fields = &trip.fields;
        let schedule = TripSchedule::from_dates(now, fields.start_date, fields.end_date);
        let (status, days_info, duration) = match schedule {
            Some(schedule) => (
                schedule.status.to_string(),
                schedule.days_info.to_string(),
                schedule.duration_text(),
            ),
            None => ("unscheduled".to_string(), "Dates not set".to_string(), String::new()),
        };
        let dates = match (fields.start_date, fields.end_date) {
            (None, None) => String::new(),
            (start, end) => format!("{} – {}", format_date(start), format_date(end)),
        };
        Self {
            id: trip.id.clone(),
            title: fields.title.clone(),
            location: trip.location_text(),
            trip_type: fields.trip_type.to_string(),
            dates,
            status,
            days_info,
            duration,
            is_favorite: fields.is_favorite,
            has_image: fields.image_url.is_some(),
            image_url: fields.image_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    message: String,
}

pub fn render_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        AskamaTemplateResponse::into_response(ErrorTemplate {
            message: message.into(),
        }),
    )
        .into_response()
}
