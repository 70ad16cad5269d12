use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;
use url::Url;

pub const APP_JSON: &str = "app.json";
pub const API_URL_ENV: &str = "MINIMALDO_API_URL";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub persist_reorder: bool,
    pub timezone: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, InfraError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            persist_reorder: false,
            timezone: None,
        })
    }

    pub fn with_persist_reorder(mut self, persist_reorder: bool) -> Self {
        self.persist_reorder = persist_reorder;
        self
    }
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "apiBaseUrl": null,
        "persistReorder": false,
        "timezone": null
    })
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Resolves the client settings. The base URL comes from, in order: the
/// runtime override (normally the `MINIMALDO_API_URL` variable), `apiBaseUrl`
/// in `app.json`, the value baked in at build time, the localhost default.
pub fn load_client_config(
    config_dir: &Path,
    runtime_override: Option<&str>,
) -> Result<ClientConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;

    let file_url = non_empty(app.get("apiBaseUrl").and_then(serde_json::Value::as_str));
    let base_url = non_empty(runtime_override)
        .or(file_url)
        .or(non_empty(option_env!("MINIMALDO_API_URL")))
        .unwrap_or(DEFAULT_API_BASE_URL);

    let persist_reorder = match app.get("persistReorder") {
        None | Some(serde_json::Value::Null) => false,
        Some(value) => value.as_bool().ok_or_else(|| {
            InfraError::InvalidConfig("persistReorder must be a boolean".to_string())
        })?,
    };

    let timezone = non_empty(app.get("timezone").and_then(serde_json::Value::as_str))
        .map(ToOwned::to_owned);

    Ok(ClientConfig {
        base_url: parse_base_url(base_url)?,
        persist_reorder,
        timezone,
    })
}

pub fn parse_base_url(raw: &str) -> Result<Url, InfraError> {
    let raw = raw.trim();
    let mut url = Url::parse(raw)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid api base url '{raw}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InfraError::InvalidConfig(format!(
            "api base url must be http or https: {raw}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
