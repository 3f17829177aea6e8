use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a TOML configuration file.
pub fn load_toml<T>(path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    use anyhow::anyhow;
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|err| anyhow!("Error opening configuration file: {}", err))?;
    from_toml_str(&content)
}

pub fn from_toml_str<T>(content: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    use anyhow::anyhow;
    toml::from_str(content).map_err(|err| anyhow!("There is an error in your config: {}", err))
}
