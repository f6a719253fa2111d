use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use tracing::error;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::Trip,
    planner::{
        form::TripForm,
        progress::{destination_progress, TripStats},
        status::{TripSchedule, TripStatus},
    },
    routes::views::{format_date, now, render_error, SelectOption, TripCard},
    services::api::ApiError,
    state::AppState,
};

const UPCOMING_ON_DASHBOARD: usize = 3;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(trips_list))
        .route("/dashboard", get(dashboard))
        .route("/new", get(new_trip))
        .route("/:id", get(trip_detail))
        .route("/:id/edit", get(edit_trip))
        .route("/:id/favorite", post(toggle_favorite))
}

#[derive(Template)]
#[template(path = "trips/dashboard.html")]
struct DashboardTemplate {
    display_name: String,
    show_error: bool,
    error_message: String,
    total: usize,
    upcoming: usize,
    ongoing: usize,
    completed: usize,
    favorites: usize,
    next_trips: Vec<TripCard>,
}

async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let (trips, error_message) = match state.api.list_trips_for_user(user).await {
        Ok(trips) => (trips, None),
        Err(err) => {
            error!(user = %user.id, "failed to load trips: {err}");
            (Vec::new(), Some("Failed to load your trips. Please try again."))
        }
    };
    let now = now();
    let stats = TripStats::collect(now, &trips);

    let mut upcoming: Vec<&Trip> = trips
        .iter()
        .filter(|trip| {
            TripSchedule::from_dates(now, trip.fields.start_date, trip.fields.end_date)
                .is_some_and(|schedule| schedule.status != TripStatus::Completed)
        })
        .collect();
    upcoming.sort_by_key(|trip| trip.fields.start_date);
    let next_trips = upcoming
        .into_iter()
        .take(UPCOMING_ON_DASHBOARD)
        .map(|trip| TripCard::from_trip(now, trip))
        .collect();

    Ok(AskamaTemplateResponse::into_response(DashboardTemplate {
        display_name: user.display_name.clone(),
        show_error: error_message.is_some(),
        error_message: error_message.unwrap_or_default().to_string(),
        total: stats.total,
        upcoming: stats.upcoming,
        ongoing: stats.ongoing,
        completed: stats.completed,
        favorites: stats.favorites,
        next_trips,
    }))
}

#[serde_as]
#[derive(Deserialize, Default)]
struct TripsQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    status: Option<TripStatus>,
    #[serde(default)]
    favorites: Option<String>,
}

#[derive(Template)]
#[template(path = "trips/list.html")]
struct TripsListTemplate {
    show_error: bool,
    error_message: String,
    status_options: Vec<SelectOption>,
    favorites_only: bool,
    trips: Vec<TripCard>,
}

async fn trips_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<TripsQuery>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let (trips, error_message) = match state.api.list_trips_for_user(user).await {
        Ok(trips) => (trips, None),
        Err(err) => {
            error!(user = %user.id, "failed to load trips: {err}");
            (Vec::new(), Some("Failed to load your trips. Please try again."))
        }
    };
    let now = now();
    let favorites_only = query.favorites.is_some();
    let cards = trips
        .iter()
        .filter(|trip| !favorites_only || trip.fields.is_favorite)
        .filter(|trip| match query.status {
            None => true,
            Some(wanted) => {
                TripSchedule::from_dates(now, trip.fields.start_date, trip.fields.end_date)
                    .is_some_and(|schedule| schedule.status == wanted)
            }
        })
        .map(|trip| TripCard::from_trip(now, trip))
        .collect();

    let mut status_options = vec![SelectOption::new("", "All trips", query.status.is_none())];
    status_options.extend(TripStatus::ALL.into_iter().map(|status| {
        SelectOption::new(status.as_str(), status.as_str(), query.status == Some(status))
    }));

    Ok(AskamaTemplateResponse::into_response(TripsListTemplate {
        show_error: error_message.is_some(),
        error_message: error_message.unwrap_or_default().to_string(),
        status_options,
        favorites_only,
        trips: cards,
    }))
}

#[derive(Clone)]
struct DestinationRow {
    name: String,
    destination_type: String,
    address: String,
    visit: String,
    price_range: String,
    priority_level: u8,
    is_completed: bool,
}

#[derive(Clone)]
struct PhotoRow {
    image_url: String,
    caption: String,
}

#[derive(Template)]
#[template(path = "trips/detail.html")]
struct TripDetailTemplate {
    card: TripCard,
    notes: String,
    traveler_count: u32,
    budget: String,
    rating: String,
    progress: u8,
    destinations: Vec<DestinationRow>,
    photos: Vec<PhotoRow>,
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let loaded = async {
        let trip = state.api.get_trip(user, &trip_id).await?;
        let mut destinations = state.api.list_destinations(user, &trip_id).await?;
        let photos = state.api.list_photos(user, &trip_id).await?;
        destinations.sort_by_key(|destination| destination.fields.order_index);
        Ok::<_, ApiError>((trip, destinations, photos))
    }
    .await;
    let (trip, destinations, photos) = match loaded {
        Ok(loaded) => loaded,
        Err(ApiError::NotFound) => return Err(AppError::NotFound),
        Err(err) => {
            error!(trip = %trip_id, "failed to load trip: {err}");
            return Ok(render_error(
                StatusCode::BAD_GATEWAY,
                "Failed to load this trip. Please try again.",
            ));
        }
    };

    let progress = destination_progress(&destinations);
    let rows = destinations
        .iter()
        .map(|destination| {
            let fields = &destination.fields;
            let visit = match (fields.visit_date, fields.visit_time) {
                (Some(date), Some(time)) => {
                    format!("{} {}", format_date(Some(date)), time.format("%H:%M"))
                }
                (Some(date), None) => format_date(Some(date)),
                (None, Some(time)) => time.format("%H:%M").to_string(),
                (None, None) => String::new(),
            };
            DestinationRow {
                name: fields.name.clone(),
                destination_type: fields.destination_type.clone().unwrap_or_default(),
                address: fields.address.clone().unwrap_or_default(),
                visit,
                price_range: fields
                    .price_range
                    .map(|tier| tier.to_string())
                    .unwrap_or_default(),
                priority_level: fields.priority_level,
                is_completed: fields.is_completed,
            }
        })
        .collect();
    let photos = photos
        .iter()
        .map(|photo| PhotoRow {
            image_url: photo.image_url.clone(),
            caption: photo.caption_text().to_string(),
        })
        .collect();

    let fields = &trip.fields;
    Ok(AskamaTemplateResponse::into_response(TripDetailTemplate {
        card: TripCard::from_trip(now(), &trip),
        notes: fields.notes.clone().unwrap_or_default(),
        traveler_count: fields.traveler_count,
        budget: fields
            .budget
            .map(|budget| format!("{budget:.2}"))
            .unwrap_or_default(),
        rating: fields
            .rating
            .map(|rating| format!("{rating}/5"))
            .unwrap_or_default(),
        progress,
        destinations: rows,
        photos,
    }))
}

async fn new_trip(State(state): State<AppState>, current: CurrentUser) -> Result<Redirect, AppError> {
    let user = current.require_user()?;
    let form_id = state.forms.open(&user.id, TripForm::new()).await;
    Ok(Redirect::to(&format!("/forms/{form_id}")))
}

async fn edit_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    if let Some(form_id) = state.forms.find_for_trip(&user.id, &trip_id).await {
        return Ok(Redirect::to(&format!("/forms/{form_id}")).into_response());
    }
    let form = match TripForm::initialize(state.api.as_ref(), user, Some(trip_id.as_str())).await {
        Ok(form) => form,
        Err(err) => {
            error!(trip = %trip_id, "failed to load trip for editing: {err}");
            return Ok(render_error(
                StatusCode::BAD_GATEWAY,
                "Failed to load this trip. Please try again.",
            ));
        }
    };
    let form_id = state.forms.open(&user.id, form).await;
    Ok(Redirect::to(&format!("/forms/{form_id}")).into_response())
}

async fn toggle_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let result = async {
        let mut trip = state.api.get_trip(user, &trip_id).await?;
        trip.fields.is_favorite = !trip.fields.is_favorite;
        state.api.update_trip(user, &trip_id, &trip.fields).await
    }
    .await;
    if let Err(err) = result {
        error!(trip = %trip_id, "failed to toggle favorite: {err}");
        return Ok(render_error(
            StatusCode::BAD_GATEWAY,
            "Failed to update this trip. Please try again.",
        ));
    }
    Ok(Redirect::to(&format!("/trips/{trip_id}")).into_response())
}
