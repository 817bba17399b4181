use crate::error::ProcessorError;
use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const BUCKET_NAME_ENV: &str = "BUCKET_NAME";

#[derive(Default, Debug, Serialize, Deserialize)]
pub struct BucketConfig {
    pub bucket_name: Option<String>,
}

impl BucketConfig {
    /// Reads `BUCKET_NAME` as the raw string it was set to; `123456`, `true`
    /// and `0123` are all valid bucket names and must not be typed.
    pub fn load() -> Result<Self, figment::Error> {
        let env = Env::raw().only(&[BUCKET_NAME_ENV]);
        let raw = BucketConfig {
            bucket_name: env.iter().map(|(_, value)| value).next(),
        };

        Figment::new().merge(Serialized::defaults(raw)).extract()
    }
}

/// Picks the bucket objects are written to.
///
/// A non-empty `explicit` name always wins. Otherwise the name comes from
/// `BUCKET_NAME`, and an unset or empty variable is
/// [`ProcessorError::NoContainerName`]. A configuration that cannot be read
/// at all is [`ProcessorError::ConfigLoad`].
pub fn resolve_container_name(explicit: Option<String>) -> Result<String, ProcessorError> {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        return Ok(name);
    }

    let config = BucketConfig::load().map_err(|e| {
        tracing::error!(env_var = BUCKET_NAME_ENV, error = ?e, "Failed to read bucket configuration");
        ProcessorError::config_load(e)
    })?;

    config
        .bucket_name
        .filter(|name| !name.is_empty())
        .ok_or(ProcessorError::NoContainerName)
}
