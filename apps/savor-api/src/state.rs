use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
	sync::{Mutex, RwLock},
	time::Instant,
};
use uuid::Uuid;

use savor_domain::RecommendationSession;
use savor_service::SavorService;

pub type SharedSession = Arc<Mutex<RecommendationSession>>;

struct SessionEntry {
	session: SharedSession,
	touched_at: Instant,
	touch: u64,
}

#[derive(Default)]
struct SessionMap {
	entries: HashMap<Uuid, SessionEntry>,
	clock: u64,
}
impl SessionMap {
	fn next_touch(&mut self) -> u64 {
		self.clock += 1;

		self.clock
	}
}

/// Live recommendation sessions. Each session has its own lock so turns on one session are
/// serialised while different sessions proceed independently.
///
/// Sessions idle for longer than `idle_ttl` expire. Inserting beyond `capacity` evicts the least
/// recently used session.
#[derive(Clone)]
pub struct SessionStore {
	inner: Arc<RwLock<SessionMap>>,
	idle_ttl: Duration,
	capacity: usize,
}
impl SessionStore {
	pub fn new(idle_ttl: Duration, capacity: usize) -> Self {
		Self { inner: Arc::default(), idle_ttl, capacity: capacity.max(1) }
	}

	pub async fn insert(&self, session: RecommendationSession) -> Uuid {
		let id = Uuid::new_v4();
		let now = Instant::now();
		let mut map = self.inner.write().await;
		let before = map.entries.len();

		map.entries.retain(|_, entry| now.duration_since(entry.touched_at) < self.idle_ttl);

		let expired = before - map.entries.len();
		let mut evicted = 0_usize;

		while map.entries.len() >= self.capacity {
			let Some(oldest) =
				map.entries.iter().min_by_key(|(_, entry)| entry.touch).map(|(id, _)| *id)
			else {
				break;
			};

			map.entries.remove(&oldest);

			evicted += 1;
		}

		if expired + evicted > 0 {
			tracing::info!(expired, evicted, live = map.entries.len(), "Sessions evicted.");
		}

		let touch = map.next_touch();

		map.entries.insert(
			id,
			SessionEntry { session: Arc::new(Mutex::new(session)), touched_at: now, touch },
		);

		id
	}

	/// Looks up a live session and marks it as used.
	pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
		let mut map = self.inner.write().await;

		if map.entries.get(&id)?.touched_at.elapsed() >= self.idle_ttl {
			map.entries.remove(&id);

			tracing::info!(session_id = %id, "Session expired.");

			return None;
		}

		let touch = map.next_touch();
		let entry = map.entries.get_mut(&id)?;

		entry.touched_at = Instant::now();
		entry.touch = touch;

		Some(entry.session.clone())
	}

	pub async fn remove(&self, id: Uuid) -> bool {
		self.inner.write().await.entries.remove(&id).is_some()
	}

	pub async fn live_count(&self) -> usize {
		self.inner.read().await.entries.len()
	}
}

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SavorService>,
	pub sessions: SessionStore,
}
impl AppState {
	pub fn new(config: savor_config::Config) -> color_eyre::Result<Self> {
		let service = SavorService::new(config)?;

		Ok(Self::with_service(service))
	}

	pub fn with_service(service: SavorService) -> Self {
		let sessions = SessionStore::new(
			Duration::from_secs(service.cfg.service.session_idle_ttl_secs),
			service.cfg.service.max_sessions,
		);

		Self { service: Arc::new(service), sessions }
	}
}
