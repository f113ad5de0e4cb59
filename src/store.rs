//! Storage contracts and built-in credential store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value persistence for the access/refresh token pair.
///
/// The gateway reads the access token before each bearer request, writes it after a successful
/// refresh, and purges both keys when a refresh fails.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the secret stored under `key`, if any.
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces the secret stored under `key`.
	fn set(&self, key: CredentialKey, secret: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes the secret stored under `key`, returning the previous value.
	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Removes every credential key.
	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			for key in CredentialKey::ALL {
				self.remove(key).await?;
			}

			Ok(())
		})
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_gateway_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let gateway_error: Error = store_error.clone().into();

		assert!(matches!(gateway_error, Error::Storage(_)));
		assert!(gateway_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&gateway_error)
			.expect("Gateway error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[tokio::test]
	async fn default_clear_removes_every_key() {
		let store = MemoryStore::default();

		store
			.set(CredentialKey::AccessToken, TokenSecret::new("A1"))
			.await
			.expect("Seeding the access token should succeed.");
		store
			.set(CredentialKey::RefreshToken, TokenSecret::new("R1"))
			.await
			.expect("Seeding the refresh token should succeed.");
		store.clear().await.expect("Clearing the store should succeed.");

		for key in CredentialKey::ALL {
			assert!(
				store.get(key).await.expect("Reading a cleared key should succeed.").is_none()
			);
		}
	}
}
