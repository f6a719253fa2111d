use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    auth::SessionStore,
    config::AppConfig,
    planner::store::FormStore,
    services::{api::ResourceApi, places::PlacesService, session::SessionProvider},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<dyn ResourceApi>,
    pub auth: Arc<dyn SessionProvider>,
    pub places: PlacesService,
    pub sessions: SessionStore,
    pub forms: FormStore,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        api: Arc<dyn ResourceApi>,
        auth: Arc<dyn SessionProvider>,
        places: PlacesService,
    ) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            config,
            api,
            auth,
            places,
            sessions: SessionStore::new(),
            forms: FormStore::new(),
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
