// Test harness for integration tests
// Builds a temporary media tree (originals, cache, fallbacks) with a
// configuration file pointing at it, plus a generator that copies the
// original to the cache path and records every job it receives.

use async_trait::async_trait;
use kagami::generator::{GenerationJob, GeneratorError, VariantGenerator};
use kagami::router::RouteTemplate;
use kagami::signing::FixedClock;
use kagami::storage::TokioFsBackend;
use kagami::{DeliveryConfig, DispatchRequest, Dispatcher, UrlBuilder};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const NOW: i64 = 1_700_000_000;

const CONFIG_TEMPLATE: &str = r#"
settings:
  route: /media/image/{format}/{id}/{file}
  duration: 600
  memory_limit: 256M
  generation_timeout_secs: 5
clients:
  web:
    secret: ${KAGAMI_IT_WEB_SECRET}
    default: true
  partner:
    secret: partner-secret
formats:
  thumb:
    default: true
    restricted: true
    width: 200
    height: 200
  full:
    type: png
    watermarked: true
  preview:
    restricted: true
    blurred: true
overlays:
  blurred:
    blur: 40
    file: /srv/overlays/lock.png
    gravity: Center
    scale: 50
  watermarked:
    file: /srv/overlays/logo.png
    gravity: SouthEast
    scale: 20
folders:
  orig: {ROOT}/orig
  cache: {ROOT}/cache
fallbacks:
  "403": {ROOT}/fallback/403.jpg
  "404": {ROOT}/fallback/404.jpg
  "412": {ROOT}/fallback/412.jpg
"#;

/// Temporary media tree with a loaded configuration
pub struct DeliveryTestHarness {
    pub dir: TempDir,
    pub config: Arc<DeliveryConfig>,
    pub clock: Arc<FixedClock>,
}

impl DeliveryTestHarness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().display().to_string();
        for sub in ["orig", "cache", "fallback"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("create media folder");
        }
        for status in ["403", "404", "412"] {
            std::fs::write(
                dir.path().join("fallback").join(format!("{}.jpg", status)),
                format!("fallback-{}", status),
            )
            .expect("write fallback");
        }

        let config_path = dir.path().join("kagami.yaml");
        std::fs::write(&config_path, CONFIG_TEMPLATE.replace("{ROOT}", &root))
            .expect("write config");

        std::env::set_var("KAGAMI_IT_WEB_SECRET", "web-secret");
        let config = DeliveryConfig::load(&config_path).expect("load config");

        Self {
            dir,
            config: Arc::new(config),
            clock: Arc::new(FixedClock::new(NOW)),
        }
    }

    pub fn add_original(&self, file: &str) -> PathBuf {
        let path = self.dir.path().join("orig").join(file);
        std::fs::create_dir_all(path.parent().expect("original has a parent"))
            .expect("create original folder");
        std::fs::write(&path, format!("original:{}", file)).expect("write original");
        path
    }

    pub fn cache_file(&self, relative: &str) -> PathBuf {
        self.dir.path().join("cache").join(relative)
    }

    pub fn fallback(&self, status: u16) -> PathBuf {
        self.dir
            .path()
            .join("fallback")
            .join(format!("{}.jpg", status))
    }

    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(Arc::clone(&self.config))
            .expect("url builder")
            .with_clock(self.clock.clone())
    }

    pub fn dispatcher(&self, generator: Arc<dyn VariantGenerator>) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.config),
            Arc::new(TokioFsBackend::new()),
            generator,
        )
        .with_clock(self.clock.clone())
    }

    /// Turn a URL minted by the builder into an inbound request
    pub fn request(&self, url: &str) -> DispatchRequest {
        let route = RouteTemplate::parse(&self.config.settings.route).expect("route");
        DispatchRequest::from_uri(&route, url).expect("url matches route")
    }
}

/// Copies the original to the cache path and records each job
#[derive(Default)]
pub struct RecordingGenerator {
    jobs: Mutex<Vec<GenerationJob>>,
    delay: Option<Duration>,
}

impl RecordingGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            jobs: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn jobs(&self) -> Vec<GenerationJob> {
        self.jobs.lock().expect("jobs lock").clone()
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().expect("jobs lock").len()
    }
}

#[async_trait]
impl VariantGenerator for RecordingGenerator {
    async fn generate(&self, job: &GenerationJob) -> Result<(), GeneratorError> {
        self.jobs.lock().expect("jobs lock").push(job.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        tokio::fs::copy(&job.original_path, &job.cache_path).await?;
        Ok(())
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read file")
}
