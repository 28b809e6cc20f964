//! Variant generation
//!
//! Pixel work happens outside this crate. A [`VariantGenerator`] receives a
//! [`GenerationJob`] (original in, cache file out, plus the settings of the
//! requested variant) and must leave a complete file at the cache path or
//! report an error.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::format::FormatSettings;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Failed to start generator: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Generator exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Generator finished without writing {path}")]
    Missing { path: String },
}

impl GeneratorError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorError::Spawn(_) => "spawn",
            GeneratorError::Failed { .. } => "exit",
            GeneratorError::Missing { .. } => "missing",
        }
    }
}

/// One variant to render
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// Id of the resource, `None` when rendering a fallback image
    pub resource_id: Option<String>,
    pub original_path: PathBuf,
    pub cache_path: PathBuf,
    pub settings: FormatSettings,
    pub memory_limit: String,
}

#[async_trait]
pub trait VariantGenerator: Send + Sync {
    async fn generate(&self, job: &GenerationJob) -> Result<(), GeneratorError>;
}

/// Runs the configured command once per job:
///
/// ```text
/// <command> <args...> <original> <cache> --format=.. --retina=0|1 [options] --memory-limit=..
/// ```
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Arguments passed after the configured ones
    pub fn job_args(job: &GenerationJob) -> Vec<String> {
        let settings = &job.settings;
        let arguments = &settings.arguments;

        let mut args = vec![
            job.original_path.display().to_string(),
            job.cache_path.display().to_string(),
            format!("--format={}", arguments.format),
            format!("--retina={}", u8::from(arguments.retina)),
        ];

        if let Some(id) = &job.resource_id {
            args.push(format!("--id={}", id));
        }
        if let Some(blur) = arguments.blur {
            args.push(format!("--blur={}", blur));
        }
        if let Some(overlay) = &arguments.overlay {
            args.push(format!("--overlay={}", overlay));
        }
        if let Some(gravity) = arguments.overlay_gravity {
            args.push(format!("--overlay-gravity={}", gravity));
        }
        if let Some(scale) = arguments.overlay_scale {
            args.push(format!("--overlay-scale={}", scale));
        }
        if let Some(width) = settings.config.width {
            args.push(format!("--width={}", width));
        }
        if let Some(height) = settings.config.height {
            args.push(format!("--height={}", height));
        }
        if let Some(quality) = settings.config.quality {
            args.push(format!("--quality={}", quality));
        }
        if let Some(clip) = settings.clip {
            args.push(format!(
                "--clip={},{},{},{}",
                clip.x, clip.y, clip.width, clip.height
            ));
        } else if let Some(focal) = settings.focal {
            args.push(format!("--focal={},{}", focal.x, focal.y));
        }
        args.push(format!("--memory-limit={}", job.memory_limit));

        args
    }
}

#[async_trait]
impl VariantGenerator for CommandGenerator {
    async fn generate(&self, job: &GenerationJob) -> Result<(), GeneratorError> {
        let output = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .args(Self::job_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(GeneratorError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
