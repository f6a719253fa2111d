//! Client for the trip/destination/photo REST API.
//!
//! Every call carries the bearer token of the user it is made for. The
//! [`ResourceApi`] trait is the seam the form controller and the views talk to;
//! [`HttpResourceApi`] is the network implementation and
//! [`InMemoryResourceApi`](crate::services::memory::InMemoryResourceApi) stands in
//! for it in tests and local runs.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::{
    auth::AuthenticatedUser,
    models::{
        destination::{Destination, DestinationFields},
        photo::Photo,
        trip::{Trip, TripFields},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("resource API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("resource not found")]
    NotFound,

    #[error("not authorized for this resource")]
    Unauthorized,

    #[error("resource API base url `{0}` cannot take path segments")]
    BaseUrl(Url),
}

#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list_trips_for_user(&self, user: &AuthenticatedUser) -> Result<Vec<Trip>, ApiError>;

    async fn get_trip(&self, user: &AuthenticatedUser, trip_id: &str) -> Result<Trip, ApiError>;

    async fn create_trip(
        &self,
        user: &AuthenticatedUser,
        fields: &TripFields,
    ) -> Result<Trip, ApiError>;

    async fn update_trip(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
        fields: &TripFields,
    ) -> Result<Trip, ApiError>;

    async fn list_destinations(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> Result<Vec<Destination>, ApiError>;

    async fn create_destination(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
        fields: &DestinationFields,
    ) -> Result<Destination, ApiError>;

    async fn update_destination(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
        fields: &DestinationFields,
    ) -> Result<Destination, ApiError>;

    async fn delete_destination(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
    ) -> Result<(), ApiError>;

    async fn list_photos(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> Result<Vec<Photo>, ApiError>;
}

/// HTTP implementation of [`ResourceApi`].
pub struct HttpResourceApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpResourceApi {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Appends each segment percent-encoded, so an id can never leave its
    /// own path segment. Empty and dot segments match no resource.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if segments
            .iter()
            .any(|segment| matches!(*segment, "" | "." | ".."))
        {
            return Err(ApiError::NotFound);
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::BaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        user: &AuthenticatedUser,
        segments: &[&str],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(path = url.path(), "GET resource");
        let response = self
            .client
            .get(url)
            .bearer_auth(&user.access_token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        user: &AuthenticatedUser,
        method: reqwest::Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(path = url.path(), %method, "write resource");
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&user.access_token)
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            _ if !status.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            _ => Ok(response),
        }
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list_trips_for_user(&self, user: &AuthenticatedUser) -> Result<Vec<Trip>, ApiError> {
        self.get_json(user, &["trips"]).await
    }

    async fn get_trip(&self, user: &AuthenticatedUser, trip_id: &str) -> Result<Trip, ApiError> {
        self.get_json(user, &["trips", trip_id]).await
    }

    async fn create_trip(
        &self,
        user: &AuthenticatedUser,
        fields: &TripFields,
    ) -> Result<Trip, ApiError> {
        self.send_json(user, reqwest::Method::POST, &["trips"], fields)
            .await
    }

    async fn update_trip(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
        fields: &TripFields,
    ) -> Result<Trip, ApiError> {
        self.send_json(user, reqwest::Method::PUT, &["trips", trip_id], fields)
            .await
    }

    async fn list_destinations(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> Result<Vec<Destination>, ApiError> {
        self.get_json(user, &["trips", trip_id, "destinations"])
            .await
    }

    async fn create_destination(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
        fields: &DestinationFields,
    ) -> Result<Destination, ApiError> {
        self.send_json(
            user,
            reqwest::Method::POST,
            &["trips", trip_id, "destinations"],
            fields,
        )
        .await
    }

    async fn update_destination(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
        fields: &DestinationFields,
    ) -> Result<Destination, ApiError> {
        self.send_json(
            user,
            reqwest::Method::PUT,
            &["destinations", destination_id],
            fields,
        )
        .await
    }

    async fn delete_destination(
        &self,
        user: &AuthenticatedUser,
        destination_id: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.endpoint(&["destinations", destination_id])?)
            .bearer_auth(&user.access_token)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn list_photos(
        &self,
        user: &AuthenticatedUser,
        trip_id: &str,
    ) -> Result<Vec<Photo>, ApiError> {
        self.get_json(user, &["trips", trip_id, "photos"])
            .await
    }
}
