//! Object store collaborator.
//!
//! [`ObjectClient`] is the narrow get/put contract the dataset accessor needs.
//! [`ObjectStoreClient`] is the production implementation backed by any
//! `object_store::ObjectStore` (S3, local filesystem, in-memory).

use std::fmt::{Display, Formatter};
use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

/// Fixed bucket + key address of the dataset object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new<S: Into<String>>(bucket: S, key: S) -> Self {
        Self { bucket: bucket.into(), key: key.into() }
    }

    /// Object path inside the bucket.
    pub fn path(&self) -> Path { Path::from(self.key.as_str()) }
}

impl Display for ObjectLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Result of a fetch that did not fail. Absence is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Bytes),
    NotFound,
}

#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Fetch the whole object. A missing object is `Ok(FetchOutcome::NotFound)`.
    async fn get_object(&self, location: &ObjectLocation) -> Result<FetchOutcome, object_store::Error>;

    /// Replace the whole object.
    async fn put_object(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), object_store::Error>;
}

/// Which object store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    S3,
    Local,
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" | "aws" => Some(StoreBackend::S3),
            "local" | "fs" | "file" => Some(StoreBackend::Local),
            "memory" | "mem" | "inmemory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::S3 => "s3",
            StoreBackend::Local => "local",
            StoreBackend::Memory => "memory",
        }
    }
}

/// [`ObjectClient`] over an `object_store::ObjectStore`.
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    /// Whether to send the content type as an object attribute. The local
    /// filesystem backend rejects attributes.
    content_type_attribute: bool,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store, content_type_attribute: true }
    }

    pub fn without_content_type(mut self) -> Self {
        self.content_type_attribute = false;
        self
    }

    pub fn in_memory() -> Self { Self::new(Arc::new(InMemory::new())) }

    pub fn store(&self) -> Arc<dyn ObjectStore> { Arc::clone(&self.store) }

    /// Build the client for a configured backend.
    ///
    /// - `S3`: bucket from `bucket`, credentials and region from the AWS environment.
    /// - `Local`: objects under `<local_root>/<bucket>/`, directory created if missing.
    /// - `Memory`: process-local, lost on exit.
    pub fn for_backend(backend: StoreBackend, bucket: &str, local_root: &FsPath) -> Result<Self, object_store::Error> {
        match backend {
            StoreBackend::S3 => {
                let s3 = AmazonS3Builder::from_env().with_bucket_name(bucket).build()?;
                Ok(Self::new(Arc::new(s3)))
            }
            StoreBackend::Local => {
                let dir = local_root.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| object_store::Error::Generic {
                    store: "LocalFileSystem",
                    source: Box::new(e),
                })?;
                let fs = LocalFileSystem::new_with_prefix(&dir)?;
                Ok(Self::new(Arc::new(fs)).without_content_type())
            }
            StoreBackend::Memory => Ok(Self::in_memory()),
        }
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    async fn get_object(&self, location: &ObjectLocation) -> Result<FetchOutcome, object_store::Error> {
        debug!(target: "personas::storage", "get_object: location='{}'", location);
        match self.store.get(&location.path()).await {
            Ok(result) => {
                let data = result.bytes().await?;
                debug!(target: "personas::storage", "get_object: location='{}' bytes={}", location, data.len());
                Ok(FetchOutcome::Found(data))
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!(target: "personas::storage", "get_object: location='{}' not found", location);
                Ok(FetchOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn put_object(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), object_store::Error> {
        debug!(target: "personas::storage", "put_object: location='{}' bytes={} content_type='{}'", location, body.len(), content_type);
        let mut opts = PutOptions::default();
        if self.content_type_attribute {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, AttributeValue::from(content_type.to_string()));
            opts.attributes = attributes;
        }
        self.store.put_opts(&location.path(), PutPayload::from_bytes(body), opts).await?;
        Ok(())
    }
}
