//! Request dispatch
//!
//! Every inbound request ends in exactly one of four outcomes:
//!
//! | status | served file                                   | format used     |
//! |--------|-----------------------------------------------|-----------------|
//! | 200    | variant of the original                       | requested       |
//! | 412    | variant of `fallbacks.412` (malformed request) | default         |
//! | 403    | variant of `fallbacks.403` (access denied)    | requested       |
//! | 404    | variant of `fallbacks.404` (original missing) | requested       |
//!
//! Fallbacks are generated and cached exactly like originals. Expected
//! request problems never surface as errors; only misconfiguration
//! (missing fallback image, unknown default format), storage failures and
//! generator failures/timeouts do.

use async_trait::async_trait;
use http::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::CachePathResolver;
use crate::coalescing::{CoalescingSlot, GenerationCoalescer};
use crate::config::{DeliveryConfig, FormatConfig};
use crate::constants::{QUERY_ISSUED_AT, QUERY_VALID_FOR, REQUIRED_QUERY_PARAMS};
use crate::error::DeliveryError;
use crate::format::{FormatKey, FormatResolver, FormatSettings};
use crate::generator::{CommandGenerator, GenerationJob, GeneratorError, VariantGenerator};
use crate::metrics::DeliveryMetrics;
use crate::paths;
use crate::resource::Resource;
use crate::security::check_path_traversal;
use crate::signing::{self, ClientRegistry, Clock, SigningContext, SystemClock};
use crate::storage::{AssetBackend, TokioFsBackend};

mod rejection;
pub mod request;

use rejection::Rejection;
pub use request::DispatchRequest;

/// Attempts to get a cache file generated before giving up when leaders
/// keep failing
const MAX_GENERATION_ATTEMPTS: usize = 2;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `cache_path` the generator writes into; the finished
/// file is renamed into place. The extension is kept for the generator.
fn staging_path(cache_path: &Path) -> PathBuf {
    let stem = cache_path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let mut name = format!(
        ".{}.{}-{}",
        stem,
        std::process::id(),
        STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    if let Some(extension) = cache_path.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    cache_path.with_file_name(name)
}

/// Removes a staging file when generation is abandoned before it was
/// renamed or cleaned up, e.g. when the dispatch future is dropped
struct StagedFile {
    backend: Arc<dyn AssetBackend>,
    path: Option<PathBuf>,
}

impl StagedFile {
    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        // Drop is not async
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let backend = Arc::clone(&self.backend);
            handle.spawn(async move {
                if let Err(e) = backend.remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging file");
                }
            });
        }
    }
}

/// Hands the chosen file to the HTTP layer
#[async_trait]
pub trait FileServer: Send + Sync {
    type Response: Send;

    async fn serve(&self, path: &Path, status: StatusCode) -> Result<Self::Response, DeliveryError>;
}

/// Resolved outcome of one request
#[derive(Debug)]
pub struct Delivery {
    pub status: StatusCode,
    /// Format the served variant was derived with
    pub key: FormatKey,
    /// Original or fallback image the variant is generated from
    pub original_path: PathBuf,
    pub cache_path: PathBuf,
    /// `None` for fallbacks
    pub resource_id: Option<String>,
    pub settings: FormatSettings,
    /// Set when the request was answered with a fallback
    pub rejection: Option<DeliveryError>,
    /// Whether this call ran the generator
    pub generated: bool,
}

impl Delivery {
    fn job(&self, memory_limit: &str) -> GenerationJob {
        GenerationJob {
            resource_id: self.resource_id.clone(),
            original_path: self.original_path.clone(),
            cache_path: self.cache_path.clone(),
            settings: self.settings.clone(),
            memory_limit: memory_limit.to_string(),
        }
    }
}

// Request fields after validation
struct Validated<'r> {
    key: FormatKey,
    restricted: bool,
    file: String,
    request: &'r DispatchRequest,
}

pub struct Dispatcher {
    config: Arc<DeliveryConfig>,
    formats: FormatResolver,
    cache: CachePathResolver,
    clients: ClientRegistry,
    backend: Arc<dyn AssetBackend>,
    generator: Arc<dyn VariantGenerator>,
    coalescer: GenerationCoalescer,
    clock: Arc<dyn Clock>,
    orig_root: String,
    cache_root: String,
    generation_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        config: Arc<DeliveryConfig>,
        backend: Arc<dyn AssetBackend>,
        generator: Arc<dyn VariantGenerator>,
    ) -> Self {
        Self {
            formats: FormatResolver::new(Arc::clone(&config)),
            cache: CachePathResolver::new(Arc::clone(&config)),
            clients: ClientRegistry::new(&config.clients),
            backend,
            generator,
            coalescer: GenerationCoalescer::new(),
            clock: Arc::new(SystemClock),
            orig_root: paths::folder_absolute(&config.folders.orig),
            cache_root: paths::folder_absolute(&config.folders.cache),
            generation_timeout: Duration::from_secs(config.settings.generation_timeout_secs),
            config,
        }
    }

    /// Local filesystem plus the configured generator command
    pub fn from_config(config: Arc<DeliveryConfig>) -> Self {
        let generator = CommandGenerator::new(&config.generator);
        Self::new(config, Arc::new(TokioFsBackend::new()), Arc::new(generator))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn formats(&self) -> &FormatResolver {
        &self.formats
    }

    pub fn cache_paths(&self) -> &CachePathResolver {
        &self.cache
    }

    /// Decide what to serve without generating anything
    pub async fn resolve(&self, request: &DispatchRequest) -> Result<Delivery, DeliveryError> {
        let validated = match self.validate(request) {
            Ok(validated) => validated,
            Err(rejection) => {
                let default_key = self.formats.parse_adjusted(self.formats.default_format());
                return self.fallback(request, rejection, default_key).await;
            }
        };

        if let Err(rejection) = self.check_access(&validated) {
            return self.fallback(request, rejection, validated.key).await;
        }

        let original_path = format!("{}{}", self.orig_root, validated.file);
        if !self.backend.exists(Path::new(&original_path)).await? {
            let rejection = Rejection::OriginalMissing(original_path);
            return self.fallback(request, rejection, validated.key).await;
        }

        let cache_path = format!(
            "{}{}",
            self.cache_root,
            self.cache.cache_path(&validated.file, &validated.key)?
        );
        Ok(Delivery {
            status: StatusCode::OK,
            settings: self.formats.format_settings(&validated.key)?,
            key: validated.key,
            original_path: PathBuf::from(original_path),
            cache_path: PathBuf::from(cache_path),
            resource_id: Some(request.id.clone()),
            rejection: None,
            generated: false,
        })
    }

    /// Resolve the request and make sure the chosen variant is in the cache
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<Delivery, DeliveryError> {
        let result = self.resolve_and_generate(request).await;
        let status = match &result {
            Ok(delivery) => delivery.status.as_u16(),
            Err(e) => e.to_http_status(),
        };
        DeliveryMetrics::global().record_dispatch(status);
        result
    }

    async fn resolve_and_generate(
        &self,
        request: &DispatchRequest,
    ) -> Result<Delivery, DeliveryError> {
        let mut delivery = self.resolve(request).await?;
        let job = delivery.job(&self.config.settings.memory_limit);
        delivery.generated = self.ensure_generated(&job).await?;
        Ok(delivery)
    }

    /// Dispatch and hand the cache file to `server`
    pub async fn serve<S: FileServer>(
        &self,
        request: &DispatchRequest,
        server: &S,
    ) -> Result<S::Response, DeliveryError> {
        let delivery = self.dispatch(request).await?;
        server.serve(&delivery.cache_path, delivery.status).await
    }

    /// Generate one variant of `resource` ahead of any request, using its
    /// clipping or focal point
    pub async fn prewarm<R: Resource>(
        &self,
        resource: &R,
        key: &FormatKey,
    ) -> Result<Delivery, DeliveryError> {
        let file = paths::relative_file(resource.file());
        let original_path = format!("{}{}", self.orig_root, file);
        if !self.backend.exists(Path::new(&original_path)).await? {
            return Err(DeliveryError::AssetNotFound(original_path));
        }

        let cache_path = format!("{}{}", self.cache_root, self.cache.cache_path(&file, key)?);
        let mut delivery = Delivery {
            status: StatusCode::OK,
            key: key.clone(),
            original_path: PathBuf::from(original_path),
            cache_path: PathBuf::from(cache_path),
            resource_id: Some(resource.id()),
            settings: self.formats.format_settings_for(key, resource)?,
            rejection: None,
            generated: false,
        };
        let job = delivery.job(&self.config.settings.memory_limit);
        delivery.generated = self.ensure_generated(&job).await?;
        Ok(delivery)
    }

    /// Remove every cached variant of `file` (optionally of one format).
    /// Returns the number of files actually removed.
    pub async fn invalidate(&self, file: &str, format: Option<&str>) -> Result<usize, DeliveryError> {
        let mut removed = 0;
        for cache_path in self.cache.enumerate_cache_paths(file, format)? {
            let path = format!("{}{}", self.cache_root, cache_path);
            if self.backend.remove_file(Path::new(&path)).await? {
                removed += 1;
            }
        }

        DeliveryMetrics::global()
            .invalidated_files
            .inc_by(removed as u64);
        tracing::info!(file = file, format = ?format, removed = removed, "Invalidated cache");
        Ok(removed)
    }

    fn validate<'r>(&self, request: &'r DispatchRequest) -> Result<Validated<'r>, Rejection> {
        for (name, value) in [
            ("format", &request.format),
            ("id", &request.id),
            ("file", &request.file),
        ] {
            if value.trim().is_empty() {
                return Err(Rejection::EmptyParam(name));
            }
        }

        check_path_traversal(&request.file)
            .map_err(|_| Rejection::PathTraversal(request.file.clone()))?;

        let key = self.formats.parse_adjusted(&request.format);
        let format_config: &FormatConfig = self
            .formats
            .format_config(key.base())
            .map_err(|_| Rejection::UnknownFormat(key.base().to_string()))?;

        if format_config.restricted {
            for param in REQUIRED_QUERY_PARAMS {
                if !request.query.contains_key(param) {
                    return Err(Rejection::MissingQuery(param));
                }
            }
            if request.issued_at().and_then(|ts| ts.parse::<i64>().ok()).is_none() {
                return Err(Rejection::MalformedQuery(QUERY_ISSUED_AT));
            }
            if request.valid_for().and_then(|sec| sec.parse::<u64>().ok()).is_none() {
                return Err(Rejection::MalformedQuery(QUERY_VALID_FOR));
            }
        }

        Ok(Validated {
            restricted: format_config.restricted,
            file: paths::relative_file(&request.file),
            key,
            request,
        })
    }

    fn check_access(&self, validated: &Validated<'_>) -> Result<(), Rejection> {
        if !validated.restricted {
            return Ok(());
        }
        let request = validated.request;

        // validate() guarantees presence and shape of the query
        let client_id = request.client().unwrap_or_default();
        let signature = request.signature().unwrap_or_default();
        let issued_at: i64 = request
            .issued_at()
            .and_then(|ts| ts.parse().ok())
            .unwrap_or_default();
        let valid_for: u64 = request
            .valid_for()
            .and_then(|sec| sec.parse().ok())
            .unwrap_or_default();

        let secret = self
            .clients
            .secret(client_id)
            .ok_or_else(|| Rejection::UnknownClient(client_id.to_string()))?;

        let context = SigningContext {
            file: &validated.file,
            resource_id: &request.id,
            issued_at,
            valid_for,
            adjusted_format: &request.format,
            client_id,
            client_secret: secret,
        };
        if !signing::verify(&context, signature) {
            return Err(Rejection::BadSignature);
        }

        let now = self.clock.now();
        if signing::is_expired(issued_at, valid_for, now) {
            return Err(Rejection::Expired {
                expired_at: issued_at.saturating_add(valid_for.min(i64::MAX as u64) as i64),
                now,
            });
        }

        Ok(())
    }

    async fn fallback(
        &self,
        request: &DispatchRequest,
        rejection: Rejection,
        key: FormatKey,
    ) -> Result<Delivery, DeliveryError> {
        let status = rejection.status();
        tracing::debug!(
            format = %request.format,
            id = %request.id,
            file = %request.file,
            status = status,
            reason = %rejection,
            "Serving fallback"
        );
        DeliveryMetrics::global().record_rejection(rejection.label());

        let fallback = self
            .config
            .fallbacks
            .path_for(status)
            .ok_or_else(|| DeliveryError::Config(format!("no fallback for status {}", status)))?;
        if !self.backend.exists(Path::new(fallback)).await? {
            tracing::error!(status = status, path = fallback, "Fallback image is missing");
            return Err(DeliveryError::FallbackMissing {
                status,
                path: fallback.to_string(),
            });
        }

        let cache_path = format!(
            "{}{}",
            self.cache_root,
            self.cache.cache_path(paths::basename(fallback), &key)?
        );
        let status_code = StatusCode::from_u16(status)
            .map_err(|e| DeliveryError::Config(format!("invalid fallback status: {}", e)))?;

        Ok(Delivery {
            status: status_code,
            settings: self.formats.format_settings(&key)?,
            key,
            original_path: PathBuf::from(fallback),
            cache_path: PathBuf::from(cache_path),
            resource_id: None,
            rejection: Some(rejection.into()),
            generated: false,
        })
    }

    /// Returns whether this call ran the generator
    async fn ensure_generated(&self, job: &GenerationJob) -> Result<bool, DeliveryError> {
        let cache_key = job.cache_path.display().to_string();

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            if self.backend.exists(&job.cache_path).await? {
                return Ok(false);
            }

            match self.coalescer.acquire(&cache_key).await {
                CoalescingSlot::Leader(guard) => {
                    // Another leader may have finished between the check and acquire
                    if self.backend.exists(&job.cache_path).await? {
                        guard.complete();
                        return Ok(false);
                    }
                    let result = self.generate(job).await;
                    guard.complete();
                    return result.map(|()| true);
                }
                CoalescingSlot::Follower => {
                    DeliveryMetrics::global().coalesced_waits.inc();
                    tracing::debug!(cache_path = %cache_key, "Waited for in-flight generation");
                }
            }
        }

        if self.backend.exists(&job.cache_path).await? {
            return Ok(false);
        }
        Err(GeneratorError::Missing { path: cache_key }.into())
    }

    async fn generate(&self, job: &GenerationJob) -> Result<(), DeliveryError> {
        let metrics = DeliveryMetrics::global();
        if let Some(parent) = job.cache_path.parent() {
            self.backend.create_dir_all(parent).await?;
        }

        // The generator never writes the cache path itself, so a reader can
        // only ever see a complete file there
        let staged_job = GenerationJob {
            cache_path: staging_path(&job.cache_path),
            ..job.clone()
        };
        let mut staged = StagedFile {
            backend: Arc::clone(&self.backend),
            path: Some(staged_job.cache_path.clone()),
        };

        tracing::info!(
            original = %job.original_path.display(),
            cache = %job.cache_path.display(),
            format = %job.settings.arguments.format,
            "Generating variant"
        );
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.generation_timeout, self.generator.generate(&staged_job))
                .await;
        let elapsed = started.elapsed();
        metrics.generation_duration.observe(elapsed.as_secs_f64());

        let error = match result {
            Ok(Ok(())) => {
                if self.backend.exists(&staged_job.cache_path).await? {
                    self.backend
                        .rename(&staged_job.cache_path, &job.cache_path)
                        .await?;
                    staged.disarm();
                    tracing::info!(
                        cache = %job.cache_path.display(),
                        duration_ms = elapsed.as_millis() as u64,
                        "Generated variant"
                    );
                    return Ok(());
                }
                DeliveryError::GenerationFailed(GeneratorError::Missing {
                    path: job.cache_path.display().to_string(),
                })
            }
            Ok(Err(e)) => DeliveryError::GenerationFailed(e),
            Err(_) => DeliveryError::GenerationTimeout {
                timeout_ms: self.generation_timeout.as_millis() as u64,
            },
        };

        let kind = match &error {
            DeliveryError::GenerationFailed(e) => e.kind(),
            _ => "timeout",
        };
        metrics.record_generation_failure(kind);
        tracing::warn!(
            cache = %job.cache_path.display(),
            error = %error,
            "Variant generation failed"
        );

        self.backend.remove_file(&staged_job.cache_path).await?;
        staged.disarm();
        Err(error)
    }
}
