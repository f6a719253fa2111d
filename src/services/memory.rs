use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    models::{
        destination::{Destination, DestinationFields},
        photo::Photo,
        trip::{Trip, TripFields},
    },
    services::api::{ApiError, ResourceApi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    ListTrips,
    GetTrip,
    CreateTrip,
    UpdateTrip,
    ListDestinations,
    CreateDestination,
    UpdateDestination,
    DeleteDestination,
    ListPhotos,
}

/// One recorded write call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateTrip {
        title: String,
    },
    UpdateTrip {
        trip_id: String,
    },
    CreateDestination {
        trip_id: String,
        name: String,
        order_index: u32,
        priority_level: u8,
    },
    UpdateDestination {
        destination_id: String,
        order_index: u32,
        priority_level: u8,
    },
    DeleteDestination {
        destination_id: String,
    },
}

#[derive(Default)]
struct Backend {
    trips: HashMap<String, Trip>,
    destinations: HashMap<String, Destination>,
    photos: Vec<Photo>,
    calls: Vec<ApiCall>,
    failing: HashSet<ApiOperation>,
    fail_after: HashMap<ApiOperation, usize>,
}

impl Backend {
    fn check(&mut self, op: ApiOperation) -> Result<(), ApiError> {
        if self.failing.contains(&op) {
            return Err(injected_failure());
        }
        if let Some(remaining) = self.fail_after.get_mut(&op) {
            if *remaining == 0 {
                return Err(injected_failure());
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn owned_trip(&self, user: &AuthenticatedUser, trip_id: &str) -> Result<&Trip, ApiError> {
        let trip = self.trips.get(trip_id).ok_or(ApiError::NotFound)?;
        if trip.user_id.as_deref() != Some(user.id.as_str()) {
            return Err(ApiError::Unauthorized);
        }
        Ok(trip)
    }

    fn owned_destination_trip(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
    ) -> Result<String, ApiError> {
        let destination = self
            .destinations
            .get(destination_id)
            .ok_or(ApiError::NotFound)?;
        let trip_id = destination.trip_id.clone();
        self.owned_trip(user, &trip_id)?;
        Ok(trip_id)
    }
}

fn injected_failure() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "injected failure".into(),
    }
}

/// In-memory resource API for tests and local development.
///
/// Records every write call and can be told to fail chosen operations.
#[derive(Default)]
pub struct InMemoryResourceApi {
    backend: Mutex<Backend>,
}

impl InMemoryResourceApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call of `op` fail.
    pub async fn fail(&self, op: ApiOperation) {
        self.backend.lock().await.failing.insert(op);
    }

    /// Lets `successes` calls of `op` through, then fails the rest.
    pub async fn fail_after(&self, op: ApiOperation, successes: usize) {
        self.backend.lock().await.fail_after.insert(op, successes);
    }

    pub async fn recover(&self, op: ApiOperation) {
        let mut backend = self.backend.lock().await;
        backend.failing.remove(&op);
        backend.fail_after.remove(&op);
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.backend.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.backend.lock().await.calls.clear();
    }

    pub async fn insert_photo(&self, photo: Photo) {
        self.backend.lock().await.photos.push(photo);
    }

    pub async fn trip_count(&self) -> usize {
        self.backend.lock().await.trips.len()
    }
}

#[async_trait]
impl ResourceApi for InMemoryResourceApi {
    async fn list_trips_for_user(&self, user: &AuthenticatedUser) -> Result<Vec<Trip>, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::ListTrips)?;
        let mut trips: Vec<Trip> = backend
            .trips
            .values()
            .filter(|trip| trip.user_id.as_deref() == Some(user.id.as_str()))
            .cloned()
            .collect();
        trips.sort_by(|a, b| a.fields.start_date.cmp(&b.fields.start_date));
        Ok(trips)
    }

    async fn get_trip(&self, user: &AuthenticatedUser, trip_id: &str) -> Result<Trip, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::GetTrip)?;
        backend.owned_trip(user, trip_id).cloned()
    }

    async fn create_trip(
        &self,
        user: &AuthenticatedUser,
        fields: &TripFields,
    ) -> Result<Trip, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::CreateTrip)?;
        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user.id.clone()),
            fields: fields.clone(),
        };
        backend.trips.insert(trip.id.clone(), trip.clone());
        backend.calls.push(ApiCall::CreateTrip {
            title: fields.title.clone(),
        });
        Ok(trip)
    }

    async fn update_trip(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
        fields: &TripFields,
    ) -> Result<Trip, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::UpdateTrip)?;
        backend.owned_trip(user, trip_id)?;
        let trip = backend.trips.get_mut(trip_id).ok_or(ApiError::NotFound)?;
        trip.fields = fields.clone();
        let updated = trip.clone();
        backend.calls.push(ApiCall::UpdateTrip {
            trip_id: trip_id.to_string(),
        });
        Ok(updated)
    }

    async fn list_destinations(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> Result<Vec<Destination>, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::ListDestinations)?;
        backend.owned_trip(user, trip_id)?;
        let mut destinations: Vec<Destination> = backend
            .destinations
            .values()
            .filter(|destination| destination.trip_id == trip_id)
            .cloned()
            .collect();
        destinations.sort_by_key(|destination| destination.fields.order_index);
        Ok(destinations)
    }

    async fn create_destination(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
        fields: &DestinationFields,
    ) -> Result<Destination, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::CreateDestination)?;
        backend.owned_trip(user, trip_id)?;
        let destination = Destination {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            fields: fields.clone(),
        };
        backend
            .destinations
            .insert(destination.id.clone(), destination.clone());
        backend.calls.push(ApiCall::CreateDestination {
            trip_id: trip_id.to_string(),
            name: fields.name.clone(),
            order_index: fields.order_index,
            priority_level: fields.priority_level,
        });
        Ok(destination)
    }

    async fn update_destination(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
        fields: &DestinationFields,
    ) -> Result<Destination, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::UpdateDestination)?;
        backend.owned_destination_trip(user, destination_id)?;
        let destination = backend
            .destinations
            .get_mut(destination_id)
            .ok_or(ApiError::NotFound)?;
        destination.fields = fields.clone();
        let updated = destination.clone();
        backend.calls.push(ApiCall::UpdateDestination {
            destination_id: destination_id.to_string(),
            order_index: fields.order_index,
            priority_level: fields.priority_level,
        });
        Ok(updated)
    }

    async fn delete_destination(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
    ) -> Result<(), ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::DeleteDestination)?;
        backend.owned_destination_trip(user, destination_id)?;
        backend.destinations.remove(destination_id);
        backend.calls.push(ApiCall::DeleteDestination {
            destination_id: destination_id.to_string(),
        });
        Ok(())
    }

    async fn list_photos(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> Result<Vec<Photo>, ApiError> {
        let mut backend = self.backend.lock().await;
        backend.check(ApiOperation::ListPhotos)?;
        backend.owned_trip(user, trip_id)?;
        Ok(backend
            .photos
            .iter()
            .filter(|photo| photo.trip_id == trip_id)
            .cloned()
            .collect())
    }
}
