//! Signed URL minting
//!
//! Application code calls [`UrlBuilder::build`] with a resource and gets
//! back a path such as
//!
//! ```text
//! /media/image/thumb-retina/42/gallery/cat.jpg?sig=..&ts=..&sec=..&client=web
//! ```
//!
//! Unrestricted formats get no query string at all, so their URLs stay
//! publicly cacheable.

use std::sync::Arc;

use crate::config::DeliveryConfig;
use crate::constants::{QUERY_CLIENT, QUERY_ISSUED_AT, QUERY_SIGNATURE, QUERY_VALID_FOR};
use crate::error::DeliveryError;
use crate::format::FormatResolver;
use crate::metrics::DeliveryMetrics;
use crate::paths;
use crate::resource::Resource;
use crate::router::RouteTemplate;
use crate::signing::{self, ClientRegistry, Clock, SigningContext, SystemClock};

/// Optional overrides for one URL; `None` means "use the configured default"
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlOptions<'a> {
    pub format: Option<&'a str>,
    pub retina: bool,
    pub blurred: Option<bool>,
    pub watermarked: Option<bool>,
    pub valid_for: Option<u64>,
    pub client_id: Option<&'a str>,
    pub client_secret: Option<&'a [u8]>,
}

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    config: Arc<DeliveryConfig>,
    formats: FormatResolver,
    clients: ClientRegistry,
    route: RouteTemplate,
    clock: Arc<dyn Clock>,
}

impl UrlBuilder {
    pub fn new(config: Arc<DeliveryConfig>) -> Result<Self, DeliveryError> {
        let route = RouteTemplate::parse(&config.settings.route).map_err(DeliveryError::Config)?;
        Ok(Self {
            formats: FormatResolver::new(Arc::clone(&config)),
            clients: ClientRegistry::new(&config.clients),
            route,
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Replace the clock used for `ts`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn formats(&self) -> &FormatResolver {
        &self.formats
    }

    /// Build a signed URL for `resource`
    ///
    /// # Errors
    ///
    /// - `UnknownClient` when no client is given and none is flagged
    ///   default, or the client has no secret and none was passed in
    /// - `UnknownFormat` when the format is not configured
    pub fn build<R: Resource>(
        &self,
        resource: &R,
        actor: Option<&R::Actor>,
        options: &UrlOptions<'_>,
    ) -> Result<String, DeliveryError> {
        let (client_id, client_secret) = self
            .clients
            .resolve(options.client_id, options.client_secret)?;

        let format = options
            .format
            .unwrap_or_else(|| self.formats.default_format());
        let key = self.formats.key_for(
            format,
            resource,
            actor,
            options.retina,
            options.blurred,
            options.watermarked,
        );

        let valid_for = options.valid_for.unwrap_or(self.config.settings.duration);
        let format_config = self.formats.format_config(key.base())?;

        let issued_at = self.clock.now();
        let file = paths::relative_file(resource.file());
        let id = resource.id();
        let adjusted = self.formats.adjusted(&key);

        let signature = signing::sign(&SigningContext {
            file: &file,
            resource_id: &id,
            issued_at,
            valid_for,
            adjusted_format: &adjusted,
            client_id: &client_id,
            client_secret: &client_secret,
        });

        let mut url = self.route.render(&adjusted, &id, &file);
        if format_config.restricted {
            url.push_str(&format!(
                "?{}={}&{}={}&{}={}&{}={}",
                QUERY_SIGNATURE,
                signature,
                QUERY_ISSUED_AT,
                issued_at,
                QUERY_VALID_FOR,
                valid_for,
                QUERY_CLIENT,
                urlencoding::encode(&client_id)
            ));
        }

        DeliveryMetrics::global().record_url(format_config.restricted);
        tracing::debug!(
            format = %adjusted,
            id = %id,
            file = %file,
            restricted = format_config.restricted,
            "Built delivery URL"
        );

        Ok(url)
    }

    /// URL without an actor, retina or modifier overrides
    pub fn build_simple<R: Resource>(
        &self,
        resource: &R,
        format: Option<&str>,
    ) -> Result<String, DeliveryError> {
        self.build(
            resource,
            None,
            &UrlOptions {
                format,
                ..Default::default()
            },
        )
    }
}
