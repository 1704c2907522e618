use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BucketError, BucketStore, ContainerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    container_exists: bool,
    objects: BTreeMap<String, StoredObject>,
}

/// In-process store used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    container: String,
    state: Mutex<MemoryState>,
}

impl MemoryBucketStore {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            state: Mutex::default(),
        }
    }

    /// A store whose container already exists.
    pub fn with_existing_container(container: impl Into<String>) -> Self {
        let store = Self::new(container);
        store.lock().container_exists = true;
        store
    }

    pub fn container_exists(&self) -> bool {
        self.lock().container_exists
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave the map half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn ensure_container(&self) -> Result<ContainerState, BucketError> {
        let mut state = self.lock();
        if state.container_exists {
            Ok(ContainerState::Existing)
        } else {
            state.container_exists = true;
            Ok(ContainerState::Created)
        }
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        let mut state = self.lock();
        if !state.container_exists {
            return Err(BucketError::NotFound(format!("container {}", self.container)));
        }
        state.objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        self.lock()
            .objects
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        self.lock().objects.remove(key);
        Ok(())
    }
}
