use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::planner::form::TripForm;

/// Working copies untouched for this long are dropped.
pub const IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const MAX_FORMS_PER_OWNER: usize = 16;

struct Entry {
    owner: String,
    trip_id: Option<String>,
    last_used: Instant,
    form: Arc<Mutex<TripForm>>,
}

impl Entry {
    fn is_expired(&self, now: Instant, idle_ttl: Duration) -> bool {
        now.duration_since(self.last_used) >= idle_ttl
    }
}

/// Working copies of the trip forms users currently have open.
///
/// Each form sits behind its own mutex, held for the whole of one user
/// action, so two requests against the same form run one after the other.
/// A user has at most one copy per saved trip and at most
/// `MAX_FORMS_PER_OWNER` copies overall; the least recently used goes first.
#[derive(Clone)]
pub struct FormStore {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    idle_ttl: Duration,
    per_owner: usize,
}

impl Default for FormStore {
    fn default() -> Self {
        Self::with_limits(IDLE_TTL, MAX_FORMS_PER_OWNER)
    }
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, per_owner: usize) -> Self {
        Self {
            entries: Arc::default(),
            idle_ttl,
            per_owner: per_owner.max(1),
        }
    }

    /// Stores `form` and returns its id. A form for a trip the owner already
    /// has open is not stored twice; the open copy's id is returned instead.
    pub async fn open(&self, owner: &str, form: TripForm) -> Uuid {
        let now = Instant::now();
        let trip_id = form.trip_id().map(str::to_string);
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now, self.idle_ttl));

        if let Some(trip_id) = trip_id.as_deref() {
            let existing = entries.iter_mut().find(|(_, entry)| {
                entry.owner == owner && entry.trip_id.as_deref() == Some(trip_id)
            });
            if let Some((form_id, entry)) = existing {
                entry.last_used = now;
                return *form_id;
            }
        }

        loop {
            let owned = entries.iter().filter(|(_, entry)| entry.owner == owner);
            if owned.clone().count() < self.per_owner {
                break;
            }
            let Some(oldest) = owned
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(form_id, _)| *form_id)
            else {
                break;
            };
            debug!(owner, form = %oldest, "evicting least recently used form");
            entries.remove(&oldest);
        }

        let form_id = Uuid::new_v4();
        entries.insert(
            form_id,
            Entry {
                owner: owner.to_string(),
                trip_id,
                last_used: now,
                form: Arc::new(Mutex::new(form)),
            },
        );
        form_id
    }

    /// The open copy of a saved trip, if the owner has one.
    pub async fn find_for_trip(&self, owner: &str, trip_id: &str) -> Option<Uuid> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .iter()
            .find(|(_, entry)| {
                entry.owner == owner
                    && entry.trip_id.as_deref() == Some(trip_id)
                    && !entry.is_expired(now, self.idle_ttl)
            })
            .map(|(form_id, _)| *form_id)
    }

    /// The form, if it exists, has not expired and belongs to `owner`.
    pub async fn get(&self, owner: &str, form_id: Uuid) -> Option<Arc<Mutex<TripForm>>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&form_id)?;
        if entry.owner != owner {
            return None;
        }
        if entry.is_expired(now, self.idle_ttl) {
            entries.remove(&form_id);
            return None;
        }
        entry.last_used = now;
        Some(Arc::clone(&entry.form))
    }

    pub async fn close(&self, owner: &str, form_id: Uuid) {
        let mut entries = self.entries.write().await;
        if entries
            .get(&form_id)
            .is_some_and(|entry| entry.owner == owner)
        {
            entries.remove(&form_id);
        }
    }

    pub async fn discard_owned_by(&self, owner: &str) {
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.owner != owner);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
