//! Remote object storage used by the ingestion stage.
//!
//! [`ObjectStore`] abstracts "download one object from one bucket to a local
//! file". [`GcsStore`] talks to the Google Cloud Storage JSON API over
//! blocking HTTP; [`LocalStore`] serves a directory tree laid out as
//! `root/<bucket>/<object>` and is what tests and offline runs use.

use crate::config::{IngestionConfig, StorageKind};
use crate::error::{ErrorKind, PipelineError, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable holding an OAuth bearer token for GCS.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Read-only access to named objects in named buckets.
pub trait ObjectStore {
    /// Copy `bucket/object` to `dest`, returning the number of bytes written.
    ///
    /// # Errors
    /// `Fetch` when the object is missing, inaccessible, or the transfer is
    /// interrupted; `Io` when the destination cannot be written.
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<u64>;
}

/// Build the store selected by the ingestion configuration.
pub fn from_config(config: &IngestionConfig) -> Result<Box<dyn ObjectStore>> {
    match config.storage {
        StorageKind::Gcs => Ok(Box::new(GcsStore::new(&config.endpoint)?)),
        StorageKind::Local => {
            let root = config.local_root.clone().ok_or_else(|| {
                PipelineError::config("storage = \"local\" requires local_root")
            })?;
            Ok(Box::new(LocalStore::new(root)))
        }
    }
}

/// Google Cloud Storage over the JSON API.
pub struct GcsStore {
    agent: ureq::Agent,
    endpoint: Url,
    token: Option<String>,
}

impl GcsStore {
    /// Store against `endpoint`, authenticating with the token from
    /// [`ACCESS_TOKEN_ENV`] when it is set.
    pub fn new(endpoint: &str) -> Result<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Self::with_token(endpoint, token)
    }

    /// # Errors
    /// `Config` when `endpoint` is not an absolute http(s) URL.
    pub fn with_token(endpoint: &str, token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Config,
                format!("invalid storage endpoint {endpoint}"),
                e,
            )
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(PipelineError::config(format!(
                "storage endpoint {endpoint} cannot hold a path"
            )));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        Ok(Self {
            agent,
            endpoint,
            token,
        })
    }

    fn media_url(&self, bucket: &str, object: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", bucket, "o", object]);
        }
        url.query_pairs_mut().append_pair("alt", "media");
        url
    }
}

impl ObjectStore for GcsStore {
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<u64> {
        let url = self.media_url(bucket, object);
        let mut request = self.agent.get(url.as_str());
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        let response = request.call().map_err(|e| {
            let context = match &e {
                ureq::Error::Status(404, _) => format!("object gs://{bucket}/{object} not found"),
                ureq::Error::Status(401 | 403, _) => {
                    format!("access denied to gs://{bucket}/{object}")
                }
                _ => format!("request for gs://{bucket}/{object} failed"),
            };
            PipelineError::with_source(ErrorKind::Fetch, context, e)
        })?;

        let mut reader = response.into_reader();
        let mut writer = create_dest(dest)?;
        let bytes = io::copy(&mut reader, &mut writer).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Fetch,
                format!("transfer of gs://{bucket}/{object} interrupted"),
                e,
            )
        })?;
        writer.flush()?;
        Ok(bytes)
    }
}

/// Buckets as directories below a local root.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for LocalStore {
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<u64> {
        let source = self.root.join(bucket).join(object);
        let mut reader = File::open(&source).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Fetch,
                format!("object {bucket}/{object} not available at {}", source.display()),
                e,
            )
        })?;
        let mut writer = create_dest(dest)?;
        let bytes = io::copy(&mut reader, &mut writer).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Fetch,
                format!("copy of {bucket}/{object} interrupted"),
                e,
            )
        })?;
        writer.flush()?;
        Ok(bytes)
    }
}

fn create_dest(dest: &Path) -> Result<BufWriter<File>> {
    let file = File::create(dest).map_err(|e| {
        PipelineError::with_source(
            ErrorKind::Io,
            format!("cannot create {}", dest.display()),
            e,
        )
    })?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_url_encodes_object_name() {
        let store = GcsStore::with_token("https://storage.googleapis.com/", None).unwrap();
        assert_eq!(
            store.media_url("my-bucket", "data/Hotel Reservations.csv").as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-bucket/o/data%2FHotel%20Reservations.csv?alt=media"
        );
    }

    #[test]
    fn test_media_url_keeps_endpoint_path() {
        let store = GcsStore::with_token("http://localhost:4443/emulator", None).unwrap();
        assert_eq!(
            store.media_url("b", "raw.csv").as_str(),
            "http://localhost:4443/emulator/storage/v1/b/b/o/raw.csv?alt=media"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let err = GcsStore::with_token("not a url", None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = GcsStore::with_token("mailto:ops@example.com", None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_local_store_copies_object() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("bucket");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join("data.csv"), "a,b\n1,2\n").unwrap();

        let dest = dir.path().join("out.csv");
        let store = LocalStore::new(dir.path());
        let bytes = store.download("bucket", "data.csv", &dest).unwrap();
        assert_eq!(bytes, 8);
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn test_local_store_missing_object_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store
            .download("bucket", "missing.csv", &dir.path().join("out.csv"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unreachable_endpoint_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GcsStore::with_token("http://127.0.0.1:9", None).unwrap();
        let err = store
            .download("bucket", "data.csv", &dir.path().join("out.csv"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.downcast_ref::<ureq::Error>().is_some());
    }
}
