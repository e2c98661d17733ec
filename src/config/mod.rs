use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::page::ElementIds;
use crate::slider::RangeBounds;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub header: Option<String>,
    #[serde(alias = "policy")]
    pub response_policy: Option<String>,
    pub vars: Option<String>,
    pub price: Option<RangeBounds>,
    pub size: Option<RangeBounds>,
    pub genres: Option<Vec<String>>,
    pub element_ids: Option<ElementIds>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
}

/// Bounds the hosting page injects before the controller starts.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueVars {
    pub min_price: f64,
    pub max_price: f64,
    pub min_price_start: Option<f64>,
    pub max_price_start: Option<f64>,
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
    pub min_size_start: Option<f64>,
    pub max_size_start: Option<f64>,
}

impl CatalogueVars {
    pub fn price_bounds(&self) -> RangeBounds {
        RangeBounds::new(
            self.min_price,
            self.max_price,
            self.min_price_start.unwrap_or(self.min_price),
            self.max_price_start.unwrap_or(self.max_price),
        )
    }

    /// Size bounds, present only when the page publishes both size limits.
    pub fn size_bounds(&self) -> Option<RangeBounds> {
        let (min, max) = (self.min_size?, self.max_size?);
        Some(RangeBounds::new(
            min,
            max,
            self.min_size_start.unwrap_or(min),
            self.max_size_start.unwrap_or(max),
        ))
    }
}

/// Accepts either bare JSON or the page script form `window.catalogueVars = {...};`.
pub fn parse_catalogue_vars(raw: &str) -> Result<CatalogueVars, String> {
    let start = raw
        .find('{')
        .ok_or_else(|| "catalogue vars: no JSON object found".to_string())?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| "catalogue vars: unterminated JSON object".to_string())?;
    serde_json::from_str::<CatalogueVars>(&raw[start..=end])
        .map_err(|e| format!("catalogue vars: {e}"))
}

pub fn load_catalogue_vars(path: &PathBuf) -> Result<CatalogueVars, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read catalogue vars '{}': {e}", path.display()))?;
    parse_catalogue_vars(&contents).map_err(|e| format!("{e} (in '{}')", path.display()))
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".catalogue-filter").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

pub fn default_config_yaml() -> String {
    r#"# catalogue-filter config
#
# Location (default):
#   ~/.catalogue-filter/config.yml

# Server
base_url: http://127.0.0.1:5000
endpoint: /catalogue
timeout: 10
# proxy: http://127.0.0.1:8080
# header: "Cookie: session=..."

# Which responses may replace the listing: latest-issued | last-resolved
response_policy: latest-issued

# Bounds, either from the page's catalogueVars script...
# vars: ./catalogue_vars.json
# ...or inline:
price:
  min: 0
  max: 100
  start_min: 0
  start_max: 100
# size:
#   min: 0.5
#   max: 150
#   start_min: 0.5
#   start_max: 150

# Genre checkboxes rendered in the filter form
genres: []

# Output
# output: ./listing.html
output_format: text
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
