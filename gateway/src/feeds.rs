//! Background feed loading
//!
//! Each dataset is fetched by its own task and installed into the shared
//! session as soon as it parses. Tasks finish in any order; a failure marks
//! only its own slot.

use crate::error::{GatewayError, Result};
use crate::routes::SharedSession;
use country_data::loader;
use country_data::session::Dataset;
use country_data::Session;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where a feed comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Http(String),
    File(PathBuf),
    /// Snapshot compiled into the binary
    Bundled(&'static [u8]),
}

impl FeedSource {
    /// The visa matrix snapshot shipped with `country-data`
    pub fn bundled_matrix() -> Self {
        Self::Bundled(loader::BUNDLED_MATRIX)
    }

    /// `http(s)://` is fetched, anything else is read from disk
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Http(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw)))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Bundled(bytes) => write!(f, "bundled snapshot ({} bytes)", bytes.len()),
        }
    }
}

/// Feed download client
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Raw feed bytes
    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>> {
        match source {
            FeedSource::Http(url) => {
                let response = self.client.get(url).send().await?;

                if !response.status().is_success() {
                    return Err(GatewayError::ApiError(format!(
                        "{} returned status: {}",
                        url,
                        response.status()
                    )));
                }

                Ok(response.bytes().await?.to_vec())
            }
            FeedSource::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| GatewayError::Unavailable(format!("{}: {}", path.display(), e))),
            FeedSource::Bundled(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Feed locations for one gateway run
#[derive(Debug, Clone)]
pub struct FeedSources {
    pub borders: FeedSource,
    pub matrix: FeedSource,
    pub facts: FeedSource,
}

/// Start all three loads concurrently
pub fn spawn_feed_loads(
    client: Arc<FeedClient>,
    sources: FeedSources,
    session: SharedSession,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_load(
            client.clone(),
            sources.borders,
            Dataset::Borders,
            session.clone(),
            loader::parse_borders,
            Session::install_borders,
        ),
        spawn_load(
            client.clone(),
            sources.matrix,
            Dataset::Matrix,
            session.clone(),
            loader::parse_matrix,
            Session::install_matrix,
        ),
        spawn_load(
            client,
            sources.facts,
            Dataset::Facts,
            session,
            loader::parse_facts,
            Session::install_facts,
        ),
    ]
}

fn spawn_load<T, P, I>(
    client: Arc<FeedClient>,
    source: FeedSource,
    dataset: Dataset,
    session: SharedSession,
    parse: P,
    install: I,
) -> JoinHandle<()>
where
    T: Send + 'static,
    P: FnOnce(&[u8]) -> country_data::Result<T> + Send + 'static,
    I: FnOnce(&mut Session, T) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let started = Instant::now();
        info!("Loading {} from {}", dataset, source);

        let loaded = client
            .fetch(&source)
            .await
            .and_then(|bytes| parse(bytes.as_slice()).map_err(GatewayError::from));

        match loaded {
            Ok(data) => {
                let mut session = session.write().await;
                if install(&mut *session, data) {
                    info!("Loaded {} in {:?}", dataset, started.elapsed());
                } else {
                    debug!("{} already loaded; discarding duplicate", dataset);
                }
            }
            Err(e) => {
                warn!("Failed to load {} from {}: {}", dataset, source, e);
                session.write().await.mark_failed(dataset, e.to_string());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use country_data::session::LoadPhase;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::sync::RwLock;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn file_source(file: &NamedTempFile) -> FeedSource {
        FeedSource::File(file.path().to_path_buf())
    }

    #[test]
    fn test_feed_source_parse() {
        assert_eq!(
            FeedSource::parse("https://example.org/world.geojson"),
            FeedSource::Http("https://example.org/world.geojson".into())
        );
        assert_eq!(
            FeedSource::parse("file:///srv/matrix.json"),
            FeedSource::File(PathBuf::from("/srv/matrix.json"))
        );
        assert_eq!(
            FeedSource::parse("data/matrix.json"),
            FeedSource::File(PathBuf::from("data/matrix.json"))
        );
    }

    #[tokio::test]
    async fn test_all_feeds_load() {
        let borders = write_temp(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"ISO_A3": "FRA"}, "geometry": null}
            ]}"#,
        );
        let matrix = write_temp(r#"{"USA": {"FRA": 90}}"#);
        let facts = write_temp(r#"[{"cca3": "FRA", "name": {"common": "France"}}]"#);

        let session = Arc::new(RwLock::new(Session::new()));
        let client = Arc::new(FeedClient::new(5).unwrap());
        let sources = FeedSources {
            borders: file_source(&borders),
            matrix: file_source(&matrix),
            facts: file_source(&facts),
        };

        for handle in spawn_feed_loads(client, sources, session.clone()) {
            handle.await.unwrap();
        }

        let session = session.read().await;
        assert!(session.is_ready());
        assert_eq!(session.facts().unwrap().display_name("FRA"), Some("France"));
    }

    #[tokio::test]
    async fn test_failed_feed_marks_only_its_slot() {
        let borders = write_temp(r#"{"type": "FeatureCollection", "features": []}"#);
        let matrix = write_temp(r#"{"USA": {"FRA": 90}}"#);
        let facts = write_temp(r#"{"not": "an array"}"#);

        let session = Arc::new(RwLock::new(Session::new()));
        let client = Arc::new(FeedClient::new(5).unwrap());
        let sources = FeedSources {
            borders: file_source(&borders),
            matrix: file_source(&matrix),
            facts: file_source(&facts),
        };

        for handle in spawn_feed_loads(client, sources, session.clone()) {
            handle.await.unwrap();
        }

        let session = session.read().await;
        assert!(!session.is_ready());
        assert!(session.matrix().is_some());
        assert!(session.borders().is_some());
        let facts = session.load_state(Dataset::Facts);
        assert_eq!(facts.state, LoadPhase::Failed);
        assert!(facts.reason.unwrap().contains("Parse error"));
    }

    #[tokio::test]
    async fn test_bundled_matrix_loads_without_network() {
        let borders = write_temp(r#"{"type": "FeatureCollection", "features": []}"#);
        let facts = write_temp(r#"[{"cca3": "FRA", "name": {"common": "France"}}]"#);

        let session = Arc::new(RwLock::new(Session::new()));
        let client = Arc::new(FeedClient::new(5).unwrap());
        let sources = FeedSources {
            borders: file_source(&borders),
            matrix: FeedSource::bundled_matrix(),
            facts: file_source(&facts),
        };

        for handle in spawn_feed_loads(client, sources, session.clone()) {
            handle.await.unwrap();
        }

        let session = session.read().await;
        assert!(session.is_ready());
        let matrix = session.matrix().unwrap();
        assert!(matrix.has_passport("USA"));
        assert!(matrix.has_passport("EGY"));
    }

    #[tokio::test]
    async fn test_feed_timeout_is_timeout_error() {
        let (addr, _server) = crate::testing::silent_server().await;
        let client = FeedClient::new(1).unwrap();
        let err = client
            .fetch(&FeedSource::Http(format!("http://{}/matrix.json", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
        assert!(err.to_string().starts_with("Timed out"));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let client = FeedClient::new(5).unwrap();
        let err = client
            .fetch(&FeedSource::File(PathBuf::from("/nonexistent/world.geojson")))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_failure() {
        let client = FeedClient::new(5).unwrap();
        // Nothing listens on the discard port locally
        let err = client
            .fetch(&FeedSource::Http("http://127.0.0.1:9/matrix.json".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::RequestFailed(_) | GatewayError::Timeout(_)
        ));
    }
}
