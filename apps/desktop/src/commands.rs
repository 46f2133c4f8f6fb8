use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use client_core::{surface::LayerId, MapEvent};
use shared::domain::LatLon;

pub const HELP: &str = "\
commands:
  click <lat> <lon>   resolve a map click (two clicks block a road)
  marker <layer-id>   click a rendered marker
  cancel              abandon a pending selection
  reload              re-fetch routes and blocked roads
  show                print the current scene
  export <path>       write the scene as GeoJSON
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(MapEvent),
    Show,
    Export(PathBuf),
    Help,
    Quit,
}

/// Blank lines and `#` comments parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    if verb.starts_with('#') {
        return Ok(None);
    }

    let command = match verb.to_ascii_lowercase().as_str() {
        "click" => {
            let lat = number(words.next(), "lat")?;
            let lon = number(words.next(), "lon")?;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                bail!("coordinates out of range: {lat}, {lon}");
            }
            Command::Event(MapEvent::MapClick(LatLon::new(lat, lon)))
        }
        "marker" => {
            let raw = words.next().ok_or_else(|| anyhow!("usage: marker <layer-id>"))?;
            let id = raw
                .parse()
                .with_context(|| format!("invalid layer id '{raw}'"))?;
            Command::Event(MapEvent::MarkerClick(LayerId(id)))
        }
        "cancel" => Command::Event(MapEvent::CancelSelection),
        "reload" => Command::Event(MapEvent::Reload),
        "show" => Command::Show,
        "export" => {
            let path = words.next().ok_or_else(|| anyhow!("usage: export <path>"))?;
            Command::Export(PathBuf::from(path))
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument '{extra}'");
    }
    Ok(Some(command))
}

fn number(word: Option<&str>, name: &str) -> Result<f64> {
    let raw = word.ok_or_else(|| anyhow!("usage: click <lat> <lon>"))?;
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid {name} '{raw}'"))?;
    if !value.is_finite() {
        bail!("invalid {name} '{raw}'");
    }
    Ok(value)
}
