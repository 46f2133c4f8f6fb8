use std::{
    collections::HashMap,
    fs,
    path::Path,
    time::Duration,
};

use anyhow::{anyhow, Context};
use shared::domain::LatLon;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "map_client.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub fade_duration_ms: u64,
    pub marker_hit_tolerance_deg: f64,
    pub refresh_routes_on_block: bool,
    pub view_center: LatLon,
    pub view_zoom: u8,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 10,
            fade_duration_ms: 500,
            marker_hit_tolerance_deg: 0.0001,
            refresh_routes_on_block: false,
            view_center: LatLon::new(-1.286389, 36.817223),
            view_zoom: 12,
        }
    }
}

impl ClientSettings {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backend_base_url(&self) -> anyhow::Result<Url> {
        let mut url = Url::parse(self.backend_url.trim())
            .with_context(|| format!("invalid backend url '{}'", self.backend_url))?;
        if url.cannot_be_a_base() {
            return Err(anyhow!("backend url '{}' cannot be a base", self.backend_url));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Defaults, then the settings file, then `APP__*` environment variables.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_SETTINGS_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .context("failed to parse settings file")?;
        apply_file_values(&mut settings, &file_cfg)?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file_values(
    settings: &mut ClientSettings,
    file_cfg: &HashMap<String, toml::Value>,
) -> anyhow::Result<()> {
    for (key, value) in file_cfg {
        let raw = match value {
            toml::Value::String(v) => v.clone(),
            other => other.to_string(),
        };
        apply_value(settings, key, &raw)
            .with_context(|| format!("invalid value for '{key}' in settings file"))?;
    }
    Ok(())
}

pub(crate) fn apply_env_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    const KEYS: [&str; 8] = [
        "backend_url",
        "request_timeout_secs",
        "fade_duration_ms",
        "marker_hit_tolerance_deg",
        "refresh_routes_on_block",
        "view_lat",
        "view_lon",
        "view_zoom",
    ];
    for key in KEYS {
        let env_key = format!("APP__{}", key.to_ascii_uppercase());
        if let Some(raw) = lookup(&env_key) {
            apply_value(settings, key, &raw).with_context(|| format!("invalid {env_key}"))?;
        }
    }
    Ok(())
}

fn apply_value(settings: &mut ClientSettings, key: &str, raw: &str) -> anyhow::Result<()> {
    let raw = raw.trim();
    match key {
        "backend_url" => settings.backend_url = raw.to_string(),
        "request_timeout_secs" => settings.request_timeout_secs = raw.parse()?,
        "fade_duration_ms" => settings.fade_duration_ms = raw.parse()?,
        "marker_hit_tolerance_deg" => settings.marker_hit_tolerance_deg = raw.parse()?,
        "refresh_routes_on_block" => settings.refresh_routes_on_block = raw.parse()?,
        "view_lat" => settings.view_center.lat = raw.parse()?,
        "view_lon" => settings.view_center.lon = raw.parse()?,
        "view_zoom" => settings.view_zoom = raw.parse()?,
        other => tracing::warn!(key = other, "config: ignoring unknown setting"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
