//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<CredentialKey, TokenSecret>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Creates a store pre-seeded with the provided token pair.
	pub fn with_tokens(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		let store = Self::default();

		{
			let mut map = store.0.write();

			map.insert(CredentialKey::AccessToken, access.into());
			map.insert(CredentialKey::RefreshToken, refresh.into());
		}

		store
	}

	/// Returns the current value for `key` without going through the async contract.
	pub fn snapshot(&self, key: CredentialKey) -> Option<TokenSecret> {
		self.0.read().get(&key).cloned()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn set(&self, key: CredentialKey, secret: TokenSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, secret);

			Ok(())
		})
	}

	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(&key)) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().clear();

			Ok(())
		})
	}
}
