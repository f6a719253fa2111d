use std::sync::Arc;

use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{AuthenticatedUser, CurrentUser},
    error::AppError,
    models::{destination::PriceTier, trip::TripType},
    planner::{
        batch::{BatchReport, ItemOutcome},
        form::{FormError, RemoveOutcome, TripForm},
    },
    routes::views::{input_date, SelectOption},
    services::places::PlaceResult,
    state::AppState,
};

const DESTINATION_PREFIX: &str = "dest-";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:form_id", get(show_form).post(submit_form))
        .route(
            "/:form_id/destinations/:index/remove",
            post(remove_destination),
        )
        .route("/:form_id/destinations/:index/place", post(apply_place))
        .route("/:form_id/place", post(apply_trip_place))
}

async fn load_form(
    state: &AppState,
    user: &AuthenticatedUser,
    form_id: Uuid,
) -> Result<Arc<Mutex<TripForm>>, AppError> {
    state
        .forms
        .get(&user.id, form_id)
        .await
        .ok_or(AppError::NotFound)
}

#[derive(Clone)]
struct DraftRow {
    index: usize,
    key: String,
    persisted: bool,
    name: String,
    description: String,
    destination_type: String,
    address: String,
    has_location: bool,
    location: String,
    visit_date: String,
    visit_time: String,
    price_options: Vec<SelectOption>,
    priority_level: u8,
    is_completed: bool,
    outcome: String,
}

#[derive(Template)]
#[template(path = "forms/edit.html")]
struct EditTripTemplate {
    form_id: String,
    is_new: bool,
    errors: Vec<String>,
    notice: String,
    autocomplete_enabled: bool,
    title: String,
    notes: String,
    start_date: String,
    end_date: String,
    country: String,
    city: String,
    type_options: Vec<SelectOption>,
    budget: String,
    traveler_count: u32,
    image_url: String,
    is_favorite: bool,
    rating: String,
    destinations: Vec<DraftRow>,
}

fn outcome_text(outcome: Option<&ItemOutcome>) -> String {
    match outcome {
        Some(ItemOutcome::Created(_)) => "created".into(),
        Some(ItemOutcome::Updated(_)) => "saved".into(),
        Some(ItemOutcome::SkippedUnnamed) => "skipped, no name".into(),
        Some(ItemOutcome::Failed(_)) => "failed to save".into(),
        Some(ItemOutcome::NotAttempted) => "not saved".into(),
        None => String::new(),
    }
}

fn render_form(
    status: StatusCode,
    form_id: Uuid,
    form: &TripForm,
    errors: Vec<String>,
    notice: &str,
    autocomplete_enabled: bool,
    report: Option<&BatchReport>,
) -> Response {
    let trip = &form.trip;
    let type_options = TripType::ALL
        .into_iter()
        .map(|kind| SelectOption::new(kind.as_str(), kind.as_str(), kind == trip.trip_type))
        .collect();
    let destinations = form
        .destinations()
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let fields = &draft.fields;
            let location = fields.location();
            let mut price_options = vec![SelectOption::new("", "–", fields.price_range.is_none())];
            price_options.extend(PriceTier::ALL.into_iter().map(|tier| {
                SelectOption::new(tier.as_str(), tier.as_str(), fields.price_range == Some(tier))
            }));
            DraftRow {
                index,
                key: draft.key().to_string(),
                persisted: !draft.is_new(),
                name: fields.name.clone(),
                description: fields.description.clone().unwrap_or_default(),
                destination_type: fields.destination_type.clone().unwrap_or_default(),
                address: fields.address.clone().unwrap_or_default(),
                has_location: location.is_some(),
                location: location
                    .map(|c| format!("{:.5}, {:.5}", c.lat, c.lng))
                    .unwrap_or_default(),
                visit_date: input_date(fields.visit_date),
                visit_time: fields
                    .visit_time
                    .map(|time| time.format("%H:%M").to_string())
                    .unwrap_or_default(),
                price_options,
                priority_level: fields.priority_level,
                is_completed: fields.is_completed,
                outcome: outcome_text(report.and_then(|r| r.outcome(index))),
            }
        })
        .collect();

    let template = EditTripTemplate {
        form_id: form_id.to_string(),
        is_new: form.is_new_trip(),
        errors,
        notice: notice.to_string(),
        autocomplete_enabled,
        title: trip.title.clone(),
        notes: trip.notes.clone().unwrap_or_default(),
        start_date: input_date(trip.start_date),
        end_date: input_date(trip.end_date),
        country: trip.country.clone().unwrap_or_default(),
        city: trip.city.clone().unwrap_or_default(),
        type_options,
        budget: trip.budget.map(|b| b.to_string()).unwrap_or_default(),
        traveler_count: trip.traveler_count,
        image_url: trip.image_url.clone().unwrap_or_default(),
        is_favorite: trip.is_favorite,
        rating: trip.rating.map(|r| r.to_string()).unwrap_or_default(),
        destinations,
    };
    (status, AskamaTemplateResponse::into_response(template)).into_response()
}

#[derive(Deserialize, Default)]
struct ShowQuery {
    #[serde(default)]
    saved: Option<String>,
}

async fn show_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(form_id): Path<Uuid>,
    Query(query): Query<ShowQuery>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let form = load_form(&state, user, form_id).await?;
    let autocomplete_enabled = state.places.readiness().wait().await;
    let form = form.lock().await;
    let notice = if query.saved.is_some() {
        "All destinations saved."
    } else {
        ""
    };
    Ok(render_form(
        StatusCode::OK,
        form_id,
        &form,
        Vec::new(),
        notice,
        autocomplete_enabled,
        None,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormAction {
    Update,
    AddDestination,
    SaveTrip,
    SaveDestinations,
    Cancel,
}

impl FormAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "update" => Some(FormAction::Update),
            "add_destination" => Some(FormAction::AddDestination),
            "save_trip" => Some(FormAction::SaveTrip),
            "save_destinations" => Some(FormAction::SaveDestinations),
            "cancel" => Some(FormAction::Cancel),
            _ => None,
        }
    }
}

fn trip_save_failure(was_new: bool) -> &'static str {
    if was_new {
        "Failed to create trip. Please try again."
    } else {
        "Failed to update trip. Please try again."
    }
}

/// Splits `dest-3-name` into the draft position and field name.
fn destination_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix(DESTINATION_PREFIX)?;
    let (index, field) = rest.split_once('-')?;
    Some((index.parse().ok()?, field))
}

/// Applies every posted field to the working copy. Fields that fail to
/// coerce are reported and the rest still apply.
fn apply_fields(form: &mut TripForm, pairs: &[(String, String)]) -> Vec<String> {
    let mut errors = Vec::new();
    for (key, value) in pairs {
        if key == "action" || key == "confirmed" {
            continue;
        }
        let result = match destination_key(key) {
            Some((index, field)) => form.update_destination_field(index, field, value),
            None => form.update_field(key, value),
        };
        if let Err(err) = result {
            errors.push(err.to_string());
        }
    }
    errors
}

async fn submit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(form_id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let shared = load_form(&state, user, form_id).await?;
    let autocomplete_enabled = state.places.readiness().is_ready();
    let action = pairs
        .iter()
        .find(|(key, _)| key == "action")
        .and_then(|(_, value)| FormAction::parse(value))
        .unwrap_or(FormAction::Update);

    if action == FormAction::Cancel {
        state.forms.close(&user.id, form_id).await;
        return Ok(Redirect::to("/trips").into_response());
    }

    let mut form = shared.lock().await;
    let errors = apply_fields(&mut form, &pairs);
    if !errors.is_empty() {
        return Ok(render_form(
            StatusCode::BAD_REQUEST,
            form_id,
            &form,
            errors,
            "",
            autocomplete_enabled,
            None,
        ));
    }

    match action {
        FormAction::Update | FormAction::Cancel => {
            Ok(Redirect::to(&format!("/forms/{form_id}")).into_response())
        }
        FormAction::AddDestination => {
            form.add_destination_draft();
            Ok(Redirect::to(&format!("/forms/{form_id}")).into_response())
        }
        FormAction::SaveTrip => {
            let was_new = form.is_new_trip();
            let result = form.submit_trip(state.api.as_ref(), user).await;
            match result {
                Ok(outcome) if outcome.destinations.is_complete_success() => {
                    drop(form);
                    state.forms.close(&user.id, form_id).await;
                    Ok(Redirect::to("/trips").into_response())
                }
                Ok(outcome) => {
                    warn!(
                        trip = %outcome.trip.id,
                        failed = outcome.destinations.failures().count(),
                        "trip created with unsaved destinations"
                    );
                    Ok(render_form(
                        StatusCode::BAD_GATEWAY,
                        form_id,
                        &form,
                        vec!["The trip was saved, but some destinations could not be saved. Please try again.".into()],
                        "",
                        autocomplete_enabled,
                        Some(&outcome.destinations),
                    ))
                }
                Err(FormError::Api(err)) => {
                    error!(user = %user.id, "failed to save trip: {err}");
                    Ok(render_form(
                        StatusCode::BAD_GATEWAY,
                        form_id,
                        &form,
                        vec![trip_save_failure(was_new).into()],
                        "",
                        autocomplete_enabled,
                        None,
                    ))
                }
                Err(err) => Ok(render_form(
                    StatusCode::BAD_REQUEST,
                    form_id,
                    &form,
                    vec![err.to_string()],
                    "",
                    autocomplete_enabled,
                    None,
                )),
            }
        }
        FormAction::SaveDestinations => {
            let result = form.save_all_destinations(state.api.as_ref(), user).await;
            match result {
                Ok(report) if report.is_complete_success() => {
                    info!(saved = report.applied_count(), "destinations saved");
                    Ok(Redirect::to(&format!("/forms/{form_id}?saved=1")).into_response())
                }
                Ok(report) => Ok(render_form(
                    StatusCode::BAD_GATEWAY,
                    form_id,
                    &form,
                    vec!["Failed to save destinations. Please try again.".into()],
                    "",
                    autocomplete_enabled,
                    Some(&report),
                )),
                Err(FormError::Api(err)) => {
                    error!(user = %user.id, "failed to reload destinations: {err}");
                    Ok(render_form(
                        StatusCode::BAD_GATEWAY,
                        form_id,
                        &form,
                        vec!["Failed to save destinations. Please try again.".into()],
                        "",
                        autocomplete_enabled,
                        None,
                    ))
                }
                Err(err) => Ok(render_form(
                    StatusCode::BAD_REQUEST,
                    form_id,
                    &form,
                    vec![err.to_string()],
                    "",
                    autocomplete_enabled,
                    None,
                )),
            }
        }
    }
}

#[derive(Template)]
#[template(path = "forms/confirm_remove.html")]
struct ConfirmRemoveTemplate {
    form_id: String,
    index: usize,
    key: String,
    name: String,
}

#[derive(Deserialize)]
struct RemoveQuery {
    key: Uuid,
}

/// Removal is posted either from the edit page, carrying every field, or
/// from the confirmation page with `confirmed=yes`.
async fn remove_destination(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((form_id, index)): Path<(Uuid, usize)>,
    Query(query): Query<RemoveQuery>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let shared = load_form(&state, user, form_id).await?;
    let autocomplete_enabled = state.places.readiness().is_ready();
    let mut form = shared.lock().await;
    match form.check_draft_key(index, query.key) {
        Ok(()) => {}
        Err(FormError::NoSuchDraft(_) | FormError::DraftMoved(_)) => {
            warn!(form = %form_id, index, "removal target moved");
            return Ok(render_form(
                StatusCode::CONFLICT,
                form_id,
                &form,
                vec![FormError::DraftMoved(index).to_string()],
                "",
                autocomplete_enabled,
                None,
            ));
        }
        Err(err) => return Err(err.into()),
    }
    let confirmed = pairs
        .iter()
        .any(|(key, value)| key == "confirmed" && value == "yes");
    let errors = apply_fields(&mut form, &pairs);
    if !errors.is_empty() {
        return Ok(render_form(
            StatusCode::BAD_REQUEST,
            form_id,
            &form,
            errors,
            "",
            autocomplete_enabled,
            None,
        ));
    }

    let result = form
        .remove_destination_draft(state.api.as_ref(), user, index, confirmed)
        .await;
    match result {
        Ok(RemoveOutcome::Removed) => Ok(Redirect::to(&format!("/forms/{form_id}")).into_response()),
        Ok(RemoveOutcome::NeedsConfirmation) => {
            let name = form.destination(index)?.fields.name.clone();
            Ok(AskamaTemplateResponse::into_response(ConfirmRemoveTemplate {
                form_id: form_id.to_string(),
                index,
                key: query.key.to_string(),
                name,
            }))
        }
        Err(FormError::NoSuchDraft(_)) => Err(AppError::NotFound),
        Err(err) => {
            error!(user = %user.id, "failed to delete destination: {err}");
            Ok(render_form(
                StatusCode::BAD_GATEWAY,
                form_id,
                &form,
                vec!["Failed to delete destination. Please try again.".into()],
                "",
                autocomplete_enabled,
                None,
            ))
        }
    }
}

async fn apply_place(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((form_id, index)): Path<(Uuid, usize)>,
    Json(place): Json<PlaceResult>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    let shared = load_form(&state, user, form_id).await?;
    let mut form = shared.lock().await;
    match form.apply_place(index, &place) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(FormError::NoSuchDraft(_)) => Err(AppError::NotFound),
        Err(err) => Err(err.into()),
    }
}

async fn apply_trip_place(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(form_id): Path<Uuid>,
    Json(place): Json<PlaceResult>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    let shared = load_form(&state, user, form_id).await?;
    shared.lock().await.apply_trip_place(&place);
    Ok(StatusCode::NO_CONTENT)
}
