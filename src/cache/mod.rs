// Cache module
//
// Maps an original file and a variant key to the relative path of the
// generated variant under the cache folder:
//
//   <base><file suffix>/<original dir>/<original stem>.<jpg|png>
//
// The same function is used to write and to look up cache entries, so the
// output must be byte-identical for identical inputs.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{DeliveryConfig, FileType};
use crate::error::DeliveryError;
use crate::format::FormatKey;
use crate::paths;

#[derive(Debug, Clone)]
pub struct CachePathResolver {
    config: Arc<DeliveryConfig>,
}

impl CachePathResolver {
    pub fn new(config: Arc<DeliveryConfig>) -> Self {
        Self { config }
    }

    fn file_type(&self, key: &FormatKey) -> Result<FileType, DeliveryError> {
        self.config
            .formats
            .get(key.base())
            .map(|format| format.file_type)
            .ok_or_else(|| DeliveryError::UnknownFormat(key.base().to_string()))
    }

    /// Variant folder followed by the original's directory, `/`-terminated
    pub fn cache_folder(&self, file: &str, key: &FormatKey) -> String {
        let mut folder = paths::folder_relative(&format!(
            "{}{}",
            key.base(),
            key.file_suffix(&self.config.suffixes)
        ));
        if let Some(dir) = paths::dirname(&paths::relative_file(file)) {
            folder.push_str(&paths::folder_relative(dir));
        }
        folder
    }

    /// Original stem with the extension of the base format's file type.
    /// Modifiers never change the extension.
    pub fn cache_filename(&self, file: &str, key: &FormatKey) -> Result<String, DeliveryError> {
        let file_type = self.file_type(key)?;
        Ok(format!(
            "{}.{}",
            paths::file_stem(file),
            file_type.extension()
        ))
    }

    /// Cache path relative to the cache folder
    pub fn cache_path(&self, file: &str, key: &FormatKey) -> Result<String, DeliveryError> {
        let filename = self.cache_filename(file, key)?;
        Ok(format!("{}{}", self.cache_folder(file, key), filename))
    }

    /// Every cache path an original can have: all formats (or just
    /// `format`) crossed with every retina/blurred/watermarked combination.
    pub fn enumerate_cache_paths(
        &self,
        file: &str,
        format: Option<&str>,
    ) -> Result<BTreeSet<String>, DeliveryError> {
        if let Some(format) = format {
            if !self.config.formats.contains_key(format) {
                return Err(DeliveryError::UnknownFormat(format.to_string()));
            }
        }

        let mut cache_paths = BTreeSet::new();
        let bases = self
            .config
            .formats
            .keys()
            .filter(|base| format.map_or(true, |format| format == *base));
        for base in bases {
            for retina in [true, false] {
                for blurred in [true, false] {
                    for watermarked in [true, false] {
                        let key = FormatKey::new(base)
                            .with_retina(retina)
                            .with_blurred(blurred)
                            .with_watermarked(watermarked);
                        cache_paths.insert(self.cache_path(file, &key)?);
                    }
                }
            }
        }
        Ok(cache_paths)
    }
}
