//! Working copy of one trip and its destination drafts.
//!
//! [`TripForm`] holds everything the edit page shows and reconciles it with
//! the resource API on explicit save actions. Field updates are purely local;
//! only `initialize`, `remove_destination_draft`, `submit_trip` and
//! `save_all_destinations` touch the network.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    models::{
        destination::{Destination, DestinationFields, PriceTier, DEFAULT_PRIORITY_LEVEL},
        trip::{Trip, TripFields, TripType, DEFAULT_TRAVELER_COUNT},
    },
    planner::batch::{BatchPolicy, BatchReport, ItemOutcome},
    services::{
        api::{ApiError, ResourceApi},
        places::PlaceResult,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("{field} must be a number")]
    InvalidNumber { field: &'static str },
    #[error("invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("no destination at position {0}")]
    NoSuchDraft(usize),
    #[error("the destination list changed, please review it and try again")]
    DraftMoved(usize),
    #[error("the trip has to be saved before its destinations")]
    TripNotSaved,
    #[error(transparent)]
    Api(#[from] ApiError),
}

macro_rules! field_names {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = FormError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw {
                    $($text => Ok($name::$variant),)+
                    other => Err(FormError::UnknownField(other.to_string())),
                }
            }
        }
    };
}

field_names!(TripField {
    Title => "title",
    Notes => "notes",
    StartDate => "start_date",
    EndDate => "end_date",
    Country => "country",
    City => "city",
    TripType => "trip_type",
    Budget => "budget",
    TravelerCount => "traveler_count",
    ImageUrl => "image_url",
    IsFavorite => "is_favorite",
    Rating => "rating",
});

field_names!(DestinationField {
    Name => "name",
    Description => "description",
    DestinationType => "destination_type",
    Address => "address",
    VisitDate => "visit_date",
    VisitTime => "visit_time",
    PriceRange => "price_range",
    PriorityLevel => "priority_level",
    IsCompleted => "is_completed",
});

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn optional_number<T: FromStr>(field: &'static str, value: &str) -> Result<Option<T>, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| FormError::InvalidNumber { field })
}

fn optional_parsed<T>(field: &'static str, value: &str) -> Result<Option<T>, FormError>
where
    T: FromStr,
    T::Err: ToString,
{
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|err| FormError::InvalidValue {
            field,
            message: err.to_string(),
        })
}

fn optional_time(field: &'static str, value: &str) -> Result<Option<NaiveTime>, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map(Some)
        .map_err(|err| FormError::InvalidValue {
            field,
            message: err.to_string(),
        })
}

fn checkbox(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// Priority as saved: the leading integer of the input clamped to 1..=5, or 3
/// when the input does not start with one. `2.5` reads as 2.
pub fn normalize_priority(value: &str) -> u8 {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && matches!(c, '+' | '-'))))
        .map_or(value.len(), |(i, _)| i);
    value[..end]
        .parse::<i64>()
        .map(|level| level.clamp(1, 5) as u8)
        .unwrap_or(DEFAULT_PRIORITY_LEVEL)
}

/// A destination being edited. Persisted iff it carries a backend id.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationDraft {
    key: Uuid,
    id: Option<String>,
    pub fields: DestinationFields,
}

impl Default for DestinationDraft {
    fn default() -> Self {
        Self::empty()
    }
}

impl DestinationDraft {
    pub fn empty() -> Self {
        Self {
            key: Uuid::new_v4(),
            id: None,
            fields: DestinationFields::default(),
        }
    }

    pub fn key(&self) -> Uuid {
        self.key
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_named(&self) -> bool {
        !self.fields.name.trim().is_empty()
    }

    fn payload(&self, position: usize) -> DestinationFields {
        let mut fields = self.fields.clone();
        fields.order_index = position as u32 + 1;
        fields
    }

    pub fn update_field(&mut self, field: DestinationField, value: &str) -> Result<(), FormError> {
        let fields = &mut self.fields;
        match field {
            DestinationField::Name => fields.name = value.to_string(),
            DestinationField::Description => fields.description = optional_text(value),
            DestinationField::DestinationType => fields.destination_type = optional_text(value),
            DestinationField::Address => fields.address = optional_text(value),
            DestinationField::VisitDate => {
                fields.visit_date = optional_parsed::<NaiveDate>(field.as_str(), value)?
            }
            DestinationField::VisitTime => fields.visit_time = optional_time(field.as_str(), value)?,
            DestinationField::PriceRange => {
                fields.price_range = optional_parsed::<PriceTier>(field.as_str(), value)?
            }
            DestinationField::PriorityLevel => fields.priority_level = normalize_priority(value),
            DestinationField::IsCompleted => fields.is_completed = checkbox(value),
        }
        Ok(())
    }

    /// Takes address, coordinates and (if still empty) the name from one
    /// lookup result.
    pub fn apply_place(&mut self, place: &PlaceResult) {
        self.fields.address = optional_text(&place.formatted_address);
        if !self.is_named() && !place.name.trim().is_empty() {
            self.fields.name = place.name.clone();
        }
        self.fields.set_location(Some(place.coordinates()));
    }
}

impl From<Destination> for DestinationDraft {
    fn from(destination: Destination) -> Self {
        Self {
            key: Uuid::new_v4(),
            id: Some(destination.id),
            fields: destination.fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NeedsConfirmation,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub trip: Trip,
    pub created: bool,
    pub destinations: BatchReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripForm {
    trip_id: Option<String>,
    pub trip: TripFields,
    destinations: Vec<DestinationDraft>,
    policy: BatchPolicy,
}

impl Default for TripForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TripForm {
    /// Empty trip (vacation, one traveler) with a single empty draft.
    pub fn new() -> Self {
        Self {
            trip_id: None,
            trip: TripFields::default(),
            destinations: vec![DestinationDraft::empty()],
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn initialize(
        api: &dyn ResourceApi,
        user: &AuthenticatedUser,
        trip_id: Option<&str>,
    ) -> Result<Self, FormError> {
        let Some(trip_id) = trip_id else {
            return Ok(Self::new());
        };
        let trip = api.get_trip(user, trip_id).await?;
        let mut destinations = api.list_destinations(user, trip_id).await?;
        destinations.sort_by_key(|destination| destination.fields.order_index);
        debug!(trip = %trip.id, count = destinations.len(), "loaded trip for editing");
        Ok(Self {
            trip_id: Some(trip.id),
            trip: trip.fields,
            destinations: destinations.into_iter().map(DestinationDraft::from).collect(),
            policy: BatchPolicy::default(),
        })
    }

    pub fn trip_id(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }

    pub fn is_new_trip(&self) -> bool {
        self.trip_id.is_none()
    }

    pub fn destinations(&self) -> &[DestinationDraft] {
        &self.destinations
    }

    pub fn destination(&self, index: usize) -> Result<&DestinationDraft, FormError> {
        self.destinations
            .get(index)
            .ok_or(FormError::NoSuchDraft(index))
    }

    /// Checks that the draft at `index` is still the one with `key`.
    pub fn check_draft_key(&self, index: usize, key: Uuid) -> Result<(), FormError> {
        if self.destination(index)?.key() != key {
            return Err(FormError::DraftMoved(index));
        }
        Ok(())
    }

    fn destination_mut(&mut self, index: usize) -> Result<&mut DestinationDraft, FormError> {
        self.destinations
            .get_mut(index)
            .ok_or(FormError::NoSuchDraft(index))
    }

    pub fn update_field(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        let field: TripField = name.parse()?;
        let key = field.as_str();
        let trip = &mut self.trip;
        match field {
            TripField::Title => trip.title = value.to_string(),
            TripField::Notes => trip.notes = optional_text(value),
            TripField::StartDate => trip.start_date = optional_parsed(key, value)?,
            TripField::EndDate => trip.end_date = optional_parsed(key, value)?,
            TripField::Country => trip.country = optional_text(value),
            TripField::City => trip.city = optional_text(value),
            TripField::TripType => {
                trip.trip_type = optional_parsed::<TripType>(key, value)?.unwrap_or_default()
            }
            TripField::Budget => trip.budget = optional_number(key, value)?,
            TripField::TravelerCount => {
                trip.traveler_count = match optional_number::<u32>(key, value)? {
                    Some(0) => {
                        return Err(FormError::InvalidValue {
                            field: key,
                            message: "at least one traveler is required".into(),
                        })
                    }
                    Some(count) => count,
                    None => DEFAULT_TRAVELER_COUNT,
                }
            }
            TripField::ImageUrl => trip.image_url = optional_text(value),
            TripField::IsFavorite => trip.is_favorite = checkbox(value),
            TripField::Rating => {
                trip.rating = match optional_number::<u8>(key, value)? {
                    Some(rating) if !(1..=5).contains(&rating) => {
                        return Err(FormError::InvalidValue {
                            field: key,
                            message: "rating goes from 1 to 5".into(),
                        })
                    }
                    rating => rating,
                }
            }
        }
        Ok(())
    }

    pub fn update_destination_field(
        &mut self,
        index: usize,
        name: &str,
        value: &str,
    ) -> Result<(), FormError> {
        let field: DestinationField = name.parse()?;
        self.destination_mut(index)?.update_field(field, value)
    }

    /// Appends an empty unpersisted draft and returns its position.
    pub fn add_destination_draft(&mut self) -> usize {
        self.destinations.push(DestinationDraft::empty());
        self.destinations.len() - 1
    }

    /// Drops a draft. Persisted drafts need `confirmed` and are deleted on the
    /// backend first; the local list only changes once that delete succeeded.
    pub async fn remove_destination_draft(
        &mut self,
        api: &dyn ResourceApi,
        user: &AuthenticatedUser,
        index: usize,
        confirmed: bool,
    ) -> Result<RemoveOutcome, FormError> {
        let draft = self.destination(index)?;
        let Some(destination_id) = draft.id.clone() else {
            self.destinations.remove(index);
            return Ok(RemoveOutcome::Removed);
        };
        if !confirmed {
            return Ok(RemoveOutcome::NeedsConfirmation);
        }
        if let Err(err) = api.delete_destination(user, &destination_id).await {
            warn!(destination = %destination_id, "failed to delete destination: {err}");
            return Err(err.into());
        }
        info!(destination = %destination_id, "destination deleted");
        self.destinations.remove(index);
        Ok(RemoveOutcome::Removed)
    }

    pub fn apply_place(&mut self, index: usize, place: &PlaceResult) -> Result<(), FormError> {
        self.destination_mut(index)?.apply_place(place);
        Ok(())
    }

    /// Fills city and country from a lookup result's address components.
    pub fn apply_trip_place(&mut self, place: &PlaceResult) {
        let city = place
            .component("locality")
            .or_else(|| place.component("postal_town"))
            .or(Some(place.name.as_str()));
        if let Some(city) = city.and_then(optional_text) {
            self.trip.city = Some(city);
        }
        if let Some(country) = place.component("country").and_then(optional_text) {
            self.trip.country = Some(country);
        }
    }

    fn validate(&self) -> Result<(), FormError> {
        if self.trip.title.trim().is_empty() {
            return Err(FormError::MissingField("title"));
        }
        Ok(())
    }

    /// Creates or updates the trip. A new trip also gets its named drafts
    /// created, in list order; an existing trip only gets the trip update.
    pub async fn submit_trip(
        &mut self,
        api: &dyn ResourceApi,
        user: &AuthenticatedUser,
    ) -> Result<SubmitOutcome, FormError> {
        self.validate()?;
        match self.trip_id.clone() {
            Some(trip_id) => {
                let trip = api.update_trip(user, &trip_id, &self.trip).await?;
                info!(trip = %trip.id, "trip updated");
                self.trip = trip.fields.clone();
                Ok(SubmitOutcome {
                    trip,
                    created: false,
                    destinations: BatchReport::new(),
                })
            }
            None => {
                let trip = api.create_trip(user, &self.trip).await?;
                info!(trip = %trip.id, "trip created");
                self.trip_id = Some(trip.id.clone());
                let destinations = self.save_drafts(api, user, &trip.id).await;
                Ok(SubmitOutcome {
                    trip,
                    created: true,
                    destinations,
                })
            }
        }
    }

    /// Creates new named drafts, updates persisted ones, then reloads the list
    /// from the backend. The reload is skipped when any item failed so that
    /// unsaved input stays on the page.
    pub async fn save_all_destinations(
        &mut self,
        api: &dyn ResourceApi,
        user: &AuthenticatedUser,
    ) -> Result<BatchReport, FormError> {
        let trip_id = self.trip_id.clone().ok_or(FormError::TripNotSaved)?;
        let report = self.save_drafts(api, user, &trip_id).await;
        if report.is_complete_success() {
            let mut destinations = api.list_destinations(user, &trip_id).await?;
            destinations.sort_by_key(|destination| destination.fields.order_index);
            self.destinations = destinations.into_iter().map(DestinationDraft::from).collect();
        }
        Ok(report)
    }

    async fn save_drafts(
        &mut self,
        api: &dyn ResourceApi,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        let mut halted = false;
        for position in 0..self.destinations.len() {
            let draft = &self.destinations[position];
            if halted {
                report.push(ItemOutcome::NotAttempted);
                continue;
            }
            // Only new drafts are filtered by name; persisted ones are always updated.
            if draft.is_new() && !draft.is_named() {
                report.push(ItemOutcome::SkippedUnnamed);
                continue;
            }
            let payload = draft.payload(position);
            let result = match draft.id.clone() {
                None => api
                    .create_destination(user, trip_id, &payload)
                    .await
                    .map(|saved| (ItemOutcome::Created(saved.id.clone()), saved)),
                Some(id) => api
                    .update_destination(user, &id, &payload)
                    .await
                    .map(|saved| (ItemOutcome::Updated(saved.id.clone()), saved)),
            };
            match result {
                Ok((outcome, saved)) => {
                    // The id is kept right away so a repeated save updates instead of duplicating.
                    let draft = &mut self.destinations[position];
                    draft.id = Some(saved.id);
                    draft.fields = payload;
                    report.push(outcome);
                }
                Err(err) => {
                    warn!(trip = %trip_id, position, "failed to save destination: {err}");
                    report.push(ItemOutcome::Failed(err.to_string()));
                    halted = self.policy == BatchPolicy::StopOnError;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        memory::{ApiCall, ApiOperation, InMemoryResourceApi},
        places::AddressComponent,
    };

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: "user-1".into(),
            email: "ada@example.com".into(),
            display_name: "Ada".into(),
            access_token: "token".into(),
        }
    }

    fn place() -> PlaceResult {
        PlaceResult {
            formatted_address: "Rua Augusta 1, Lisbon, Portugal".into(),
            name: "Rua Augusta Arch".into(),
            lat: 38.7078,
            lng: -9.1366,
            address_components: vec![
                AddressComponent {
                    long_name: "Lisbon".into(),
                    short_name: "Lisbon".into(),
                    types: vec!["locality".into(), "political".into()],
                },
                AddressComponent {
                    long_name: "Portugal".into(),
                    short_name: "PT".into(),
                    types: vec!["country".into(), "political".into()],
                },
            ],
        }
    }

    #[test]
    fn new_form_has_defaults_and_one_draft() {
        let form = TripForm::new();
        assert!(form.is_new_trip());
        assert_eq!(form.trip.trip_type, TripType::Vacation);
        assert_eq!(form.trip.traveler_count, 1);
        assert_eq!(form.destinations().len(), 1);
        assert!(form.destinations()[0].is_new());
    }

    #[test]
    fn field_updates_coerce_types() {
        let mut form = TripForm::new();
        form.update_field("budget", "1250.50").unwrap();
        assert_eq!(form.trip.budget, Some(1250.5));
        form.update_field("budget", "").unwrap();
        assert_eq!(form.trip.budget, None);
        form.update_field("traveler_count", "4").unwrap();
        form.update_field("start_date", "2025-05-01").unwrap();
        assert_eq!(form.trip.start_date, NaiveDate::from_ymd_opt(2025, 5, 1));

        let err = form.update_field("traveler_count", "many").unwrap_err();
        assert!(matches!(err, FormError::InvalidNumber { field: "traveler_count" }));
        assert_eq!(form.trip.traveler_count, 4);
        form.update_field("traveler_count", "").unwrap();
        assert_eq!(form.trip.traveler_count, 1);

        assert!(matches!(
            form.update_field("password", "x"),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn unparseable_priority_falls_back_to_three() {
        let mut form = TripForm::new();
        form.update_destination_field(0, "priority_level", "5").unwrap();
        assert_eq!(form.destinations()[0].fields.priority_level, 5);
        form.update_destination_field(0, "priority_level", "urgent")
            .unwrap();
        assert_eq!(form.destinations()[0].fields.priority_level, 3);
    }

    #[test]
    fn priority_keeps_the_leading_integer() {
        assert_eq!(normalize_priority("2.5"), 2);
        assert_eq!(normalize_priority(" 4 stars"), 4);
        assert_eq!(normalize_priority("9"), 5);
        assert_eq!(normalize_priority("-1"), 1);
        assert_eq!(normalize_priority("+"), 3);
        assert_eq!(normalize_priority(""), 3);
    }

    #[test]
    fn place_result_sets_both_coordinates() {
        let mut form = TripForm::new();
        assert_eq!(form.destinations()[0].fields.location(), None);
        form.apply_place(0, &place()).unwrap();
        let draft = &form.destinations()[0];
        let location = draft.fields.location().unwrap();
        assert_eq!((location.lat, location.lng), (38.7078, -9.1366));
        assert_eq!(draft.fields.name, "Rua Augusta Arch");

        form.apply_trip_place(&place());
        assert_eq!(form.trip.city.as_deref(), Some("Lisbon"));
        assert_eq!(form.trip.country.as_deref(), Some("Portugal"));
    }

    #[tokio::test]
    async fn submit_requires_title() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        let err = form.submit_trip(&api, &user()).await.unwrap_err();
        assert!(matches!(err, FormError::MissingField("title")));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn submit_new_trip_skips_unnamed_drafts() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        form.update_field("title", "Lisbon").unwrap();
        form.update_destination_field(0, "name", "Alfama").unwrap();
        form.add_destination_draft();

        let outcome = form.submit_trip(&api, &user()).await.unwrap();
        assert!(outcome.created);
        assert_eq!(
            outcome.destinations.outcome(1),
            Some(&ItemOutcome::SkippedUnnamed)
        );
        let creates: Vec<_> = api
            .calls()
            .await
            .into_iter()
            .filter(|call| matches!(call, ApiCall::CreateDestination { .. }))
            .collect();
        assert_eq!(creates.len(), 1);
        assert!(matches!(
            &creates[0],
            ApiCall::CreateDestination { order_index: 1, priority_level: 3, name, .. } if name == "Alfama"
        ));
    }

    #[tokio::test]
    async fn existing_trip_submit_only_updates_trip() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        form.update_field("title", "Porto").unwrap();
        form.update_destination_field(0, "name", "Ribeira").unwrap();
        let created = form.submit_trip(&api, &user()).await.unwrap();
        api.clear_calls().await;

        let mut form = TripForm::initialize(&api, &user(), Some(created.trip.id.as_str()))
            .await
            .unwrap();
        assert!(!form.destinations()[0].is_new());
        form.update_field("notes", "bring a jacket").unwrap();
        form.submit_trip(&api, &user()).await.unwrap();
        assert_eq!(
            api.calls().await,
            vec![ApiCall::UpdateTrip {
                trip_id: created.trip.id.clone()
            }]
        );
    }

    #[tokio::test]
    async fn save_all_stops_at_first_failure_and_keeps_prefix() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        form.update_field("title", "Rome").unwrap();
        form.submit_trip(&api, &user()).await.unwrap();
        form.update_destination_field(0, "name", "Colosseum").unwrap();
        for name in ["Pantheon", "Trevi"] {
            let index = form.add_destination_draft();
            form.update_destination_field(index, "name", name).unwrap();
        }
        api.fail_after(ApiOperation::CreateDestination, 1).await;

        let report = form.save_all_destinations(&api, &user()).await.unwrap();
        assert!(matches!(report.outcome(0), Some(ItemOutcome::Created(_))));
        assert!(matches!(report.outcome(1), Some(ItemOutcome::Failed(_))));
        assert_eq!(report.outcome(2), Some(&ItemOutcome::NotAttempted));
        assert!(!form.destinations()[0].is_new());
        assert!(form.destinations()[1].is_new());
        assert_eq!(form.destinations().len(), 3);

        api.recover(ApiOperation::CreateDestination).await;
        let report = form.save_all_destinations(&api, &user()).await.unwrap();
        assert!(matches!(report.outcome(0), Some(ItemOutcome::Updated(_))));
        assert!(report.is_complete_success());
        assert!(form.destinations().iter().all(|draft| !draft.is_new()));
        let orders: Vec<u32> = form
            .destinations()
            .iter()
            .map(|draft| draft.fields.order_index)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn save_all_updates_persisted_draft_with_cleared_name() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        form.update_field("title", "Oslo").unwrap();
        form.update_destination_field(0, "name", "Opera").unwrap();
        form.submit_trip(&api, &user()).await.unwrap();
        let destination_id = form.destinations()[0].id().unwrap().to_string();
        api.clear_calls().await;

        form.update_destination_field(0, "name", "").unwrap();
        form.update_destination_field(0, "description", "edited")
            .unwrap();
        let report = form.save_all_destinations(&api, &user()).await.unwrap();

        assert_eq!(
            report.outcome(0),
            Some(&ItemOutcome::Updated(destination_id.clone()))
        );
        assert_eq!(
            api.calls().await,
            vec![ApiCall::UpdateDestination {
                destination_id,
                order_index: 1,
                priority_level: 3,
            }]
        );
        let fields = &form.destinations()[0].fields;
        assert_eq!(fields.name, "");
        assert_eq!(fields.description.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn save_all_requires_saved_trip() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        assert!(matches!(
            form.save_all_destinations(&api, &user()).await,
            Err(FormError::TripNotSaved)
        ));
    }

    #[tokio::test]
    async fn stale_draft_key_is_rejected_after_the_list_shifts() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        form.update_field("title", "Oslo").unwrap();
        form.update_destination_field(0, "name", "Opera").unwrap();
        let index = form.add_destination_draft();
        form.update_destination_field(index, "name", "Fram Museum")
            .unwrap();
        form.submit_trip(&api, &user()).await.unwrap();
        let opera = form.destinations()[0].key();
        form.check_draft_key(0, opera).unwrap();

        form.remove_destination_draft(&api, &user(), 0, true)
            .await
            .unwrap();

        assert!(matches!(
            form.check_draft_key(0, opera),
            Err(FormError::DraftMoved(0))
        ));
        assert!(matches!(
            form.check_draft_key(5, opera),
            Err(FormError::NoSuchDraft(5))
        ));
        assert_eq!(form.destinations()[0].fields.name, "Fram Museum");
    }

    #[tokio::test]
    async fn removing_unsaved_draft_makes_no_call() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        let outcome = form
            .remove_destination_draft(&api, &user(), 0, false)
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(form.destinations().is_empty());
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn removing_persisted_draft_asks_then_deletes() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new();
        form.update_field("title", "Oslo").unwrap();
        form.update_destination_field(0, "name", "Opera").unwrap();
        form.submit_trip(&api, &user()).await.unwrap();
        let destination_id = form.destinations()[0].id().unwrap().to_string();

        let outcome = form
            .remove_destination_draft(&api, &user(), 0, false)
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::NeedsConfirmation);
        assert_eq!(form.destinations().len(), 1);

        api.fail(ApiOperation::DeleteDestination).await;
        assert!(form
            .remove_destination_draft(&api, &user(), 0, true)
            .await
            .is_err());
        assert_eq!(form.destinations().len(), 1);

        api.recover(ApiOperation::DeleteDestination).await;
        form.remove_destination_draft(&api, &user(), 0, true)
            .await
            .unwrap();
        assert!(form.destinations().is_empty());
        assert!(api
            .calls()
            .await
            .contains(&ApiCall::DeleteDestination { destination_id }));
    }

    #[tokio::test]
    async fn continue_on_error_attempts_every_draft() {
        let api = InMemoryResourceApi::new();
        let mut form = TripForm::new().with_policy(BatchPolicy::ContinueOnError);
        form.update_field("title", "Porto").unwrap();
        form.submit_trip(&api, &user()).await.unwrap();
        form.update_destination_field(0, "name", "Ribeira").unwrap();
        for name in ["Livraria Lello", "Serralves"] {
            let index = form.add_destination_draft();
            form.update_destination_field(index, "name", name).unwrap();
        }
        api.fail_after(ApiOperation::CreateDestination, 1).await;

        let report = form.save_all_destinations(&api, &user()).await.unwrap();
        assert!(matches!(report.outcome(1), Some(ItemOutcome::Failed(_))));
        assert!(matches!(report.outcome(2), Some(ItemOutcome::Failed(_))));
        assert_eq!(report.failures().count(), 2);
        assert_eq!(form.destinations().len(), 3);
    }
}
