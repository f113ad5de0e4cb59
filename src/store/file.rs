//! Simple file-backed [`CredentialStore`] for CLI hosts and long-running agents.

// std
use std::{
	collections::BTreeMap,
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

type Snapshot = BTreeMap<CredentialKey, TokenSecret>;

/// Persists credentials to a JSON object (`{"token": .., "refreshToken": ..}`) after each
/// mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(Snapshot::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Snapshot::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.inner.read().get(&key).cloned()) })
	}

	fn set(&self, key: CredentialKey, secret: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(key, secret);
			self.persist_locked(&guard)
		})
	}

	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let previous = guard.remove(&key);

			if previous.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(previous)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.clear();
			self.persist_locked(&guard)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"elearn_gateway_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.set(CredentialKey::AccessToken, TokenSecret::new("A1")))
			.expect("Failed to save access token to file store.");
		rt.block_on(store.set(CredentialKey::RefreshToken, TokenSecret::new("R1")))
			.expect("Failed to save refresh token to file store.");
		drop(store);

		let raw = fs::read_to_string(&path).expect("Snapshot file should be readable.");
		let json: serde_json::Value =
			serde_json::from_str(&raw).expect("Snapshot file should contain JSON.");

		assert_eq!(json, serde_json::json!({ "token": "A1", "refreshToken": "R1" }));

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get(CredentialKey::AccessToken))
			.expect("Failed to fetch access token from file store.")
			.expect("File store lost access token after reopen.");

		assert_eq!(fetched.expose(), "A1");

		rt.block_on(reopened.clear()).expect("Failed to clear file store.");

		let cleared = FileStore::open(&path).expect("Failed to reopen cleared file store.");

		assert!(
			rt.block_on(cleared.get(CredentialKey::RefreshToken))
				.expect("Reading a cleared key should succeed.")
				.is_none()
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn empty_file_opens_as_empty_store() {
		let path = temp_path();

		fs::write(&path, b"\n").expect("Failed to create empty snapshot file.");

		let store = FileStore::open(&path).expect("Empty snapshot should open.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		assert!(
			rt.block_on(store.get(CredentialKey::AccessToken))
				.expect("Reading from an empty store should succeed.")
				.is_none()
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
