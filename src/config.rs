//! Viewer settings persisted as JSON.

use std::{collections::BTreeMap, fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compositor::{DoorState, Lighting};
use crate::layer::{AnimationMode, LayerKind, LayerRegistry};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Layers missing from the map are visible
    pub layers: BTreeMap<LayerKind, bool>,
    pub schedule_filter: bool,
    pub hour: u32,
    pub doors_closed: bool,
    pub night: bool,
    pub zoom: f32,
    pub animation: AnimationMode,
    pub ambient_icons: bool,
    pub ambient_ranges: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        ViewerSettings {
            layers: LayerKind::ALL.into_iter().map(|kind| (kind, true)).collect(),
            schedule_filter: false,
            hour: 12,
            doors_closed: false,
            night: false,
            zoom: 1.0,
            animation: AnimationMode::Icon,
            ambient_icons: true,
            ambient_ranges: true,
        }
    }
}

impl ViewerSettings {
    /// Read settings from `path`, or the defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn door_state(&self) -> DoorState {
        if self.doors_closed {
            DoorState::Closed
        } else {
            DoorState::Open
        }
    }

    pub fn lighting(&self) -> Lighting {
        if self.night {
            Lighting::Night
        } else {
            Lighting::Day
        }
    }

    pub fn layer_visible(&self, kind: LayerKind) -> bool {
        self.layers.get(&kind).copied().unwrap_or(true)
    }

    /// Push visibility, schedule, door and representation state into a registry
    pub fn apply(&self, registry: &mut LayerRegistry) {
        for kind in LayerKind::ALL {
            registry.set_visible(kind, self.layer_visible(kind));
        }
        registry.set_schedule_filter(self.schedule_filter);
        registry.set_hour(self.hour);
        registry.set_door_state(self.door_state());
        registry.set_ambient_icons(self.ambient_icons);
        registry.set_ambient_ranges(self.ambient_ranges);
        match self.animation {
            AnimationMode::Icon => registry.set_animation_real(false),
            AnimationMode::Real => {
                registry.set_animation_real(true);
                registry.set_animation_animated(false);
            }
            AnimationMode::Animated => registry.set_animation_animated(true),
        }
    }
}
