use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use kagami::config::DeliveryConfig;
use kagami::logging::{init_subscriber, LogFormat};
use kagami::resource::StaticResource;
use kagami::router::RouteTemplate;
use kagami::{DispatchRequest, Dispatcher, UrlBuilder, UrlOptions};
use std::path::PathBuf;
use std::sync::Arc;

/// Kagami - signed, time-limited URLs for media variants
#[derive(Parser, Debug)]
#[command(name = "kagami")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "kagami.yaml")]
    config: PathBuf,

    /// Log output format (json or text)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print a summary
    Check,

    /// Build a signed URL
    Url {
        /// Resource id
        #[arg(long)]
        id: String,

        /// Original file, relative to the originals folder
        #[arg(long)]
        file: String,

        /// Base format (default: the configured default format)
        #[arg(long)]
        format: Option<String>,

        #[arg(long)]
        retina: bool,

        /// Force blurring on or off
        #[arg(long)]
        blurred: Option<bool>,

        /// Force the watermark on or off
        #[arg(long)]
        watermarked: Option<bool>,

        /// Validity window in seconds (default: settings.duration)
        #[arg(long)]
        valid_for: Option<u64>,

        /// Client id (default: the configured default client)
        #[arg(long)]
        client: Option<String>,
    },

    /// Dispatch a request path (with query) and generate the variant
    Dispatch {
        /// Path and query, e.g. /media/image/thumb/42/cat.jpg?sig=..
        uri: String,
    },

    /// List every cache path an original can have
    CachePaths {
        file: String,

        #[arg(long)]
        format: Option<String>,
    },

    /// Delete every cached variant of an original
    Invalidate {
        file: String,

        #[arg(long)]
        format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_subscriber(args.log_format)
        .map_err(|e| anyhow!("Failed to initialize logging subsystem: {}", e))?;

    let config = DeliveryConfig::load(&args.config)
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    let config = Arc::new(config);

    tracing::info!(
        config_file = %args.config.display(),
        formats = config.formats.len(),
        clients = config.clients.len(),
        route = %config.settings.route,
        "Configuration loaded successfully"
    );

    match args.command {
        Command::Check => {
            let dispatcher = Dispatcher::from_config(Arc::clone(&config));
            let formats = dispatcher.formats();
            println!("route:          {}", config.settings.route);
            println!("default format: {}", formats.default_format());
            for (name, format) in config.formats.iter() {
                println!(
                    "format {:<12} restricted={} blurred={} watermarked={} type={}",
                    name,
                    format.restricted,
                    format.blurred,
                    format.watermarked,
                    format.file_type.extension()
                );
            }
            for (id, client) in config.clients.iter() {
                println!("client {:<12} default={}", id, client.default);
            }
        }

        Command::Url {
            id,
            file,
            format,
            retina,
            blurred,
            watermarked,
            valid_for,
            client,
        } => {
            let builder = UrlBuilder::new(Arc::clone(&config))?;
            let resource = StaticResource::new(id, file);
            let url = builder.build(
                &resource,
                None,
                &UrlOptions {
                    format: format.as_deref(),
                    retina,
                    blurred,
                    watermarked,
                    valid_for,
                    client_id: client.as_deref(),
                    client_secret: None,
                },
            )?;
            println!("{}", url);
        }

        Command::Dispatch { uri } => {
            let route = RouteTemplate::parse(&config.settings.route).map_err(|e| anyhow!(e))?;
            let request = DispatchRequest::from_uri(&route, &uri)
                .with_context(|| format!("'{}' does not match route {}", uri, route.as_str()))?;

            let dispatcher = Dispatcher::from_config(Arc::clone(&config));
            let delivery = dispatcher.dispatch(&request).await?;

            let outcome = serde_json::json!({
                "status": delivery.status.as_u16(),
                "format": dispatcher.formats().adjusted(&delivery.key),
                "original": delivery.original_path.display().to_string(),
                "cache": delivery.cache_path.display().to_string(),
                "generated": delivery.generated,
                "reason": delivery.rejection.as_ref().map(|e| e.to_string()),
                "settings": delivery.settings,
            });
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::CachePaths { file, format } => {
            let dispatcher = Dispatcher::from_config(Arc::clone(&config));
            for path in dispatcher
                .cache_paths()
                .enumerate_cache_paths(&file, format.as_deref())?
            {
                println!("{}", path);
            }
        }

        Command::Invalidate { file, format } => {
            let dispatcher = Dispatcher::from_config(Arc::clone(&config));
            let removed = dispatcher.invalidate(&file, format.as_deref()).await?;
            println!("removed {} cached variant(s) of {}", removed, file);
        }
    }

    Ok(())
}
