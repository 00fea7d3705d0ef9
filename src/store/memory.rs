//! Thread-safe in-memory [`ProxyStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	schedule::CachedSchedule,
	store::{ProxyStore, StoreFuture, StoreSnapshot},
	token::TokenRecord,
};

type Slots = Arc<RwLock<StoreSnapshot>>;

/// Keeps both slots in-process; every clone shares the same state, mirroring the
/// "all instances see the same store" behavior of a real backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slots);
impl ProxyStore for MemoryStore {
	fn save_tokens(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().tokens = Some(record);

			Ok(())
		})
	}

	fn fetch_tokens(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().tokens.clone()) })
	}

	fn save_schedule(&self, snapshot: CachedSchedule) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().schedule = Some(snapshot);

			Ok(())
		})
	}

	fn fetch_schedule(&self) -> StoreFuture<'_, Option<CachedSchedule>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().schedule.clone()) })
	}
}
