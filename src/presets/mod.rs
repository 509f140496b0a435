//! Presets: named bundles of default scaffold and cleanup steps for a kind
//! of project.

mod laravel;
mod php;

pub use laravel::LaravelPreset;
pub use php::PhpPreset;

use crate::config::StepConfig;
use std::path::Path;

pub trait Preset: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the checkout at `path` looks like this kind of project.
    fn detect(&self, path: &Path) -> bool;

    fn scaffold_steps(&self) -> Vec<StepConfig>;

    fn cleanup_steps(&self) -> Vec<StepConfig> {
        Vec::new()
    }
}

/// Registered presets in registration order.
#[derive(Default)]
pub struct PresetManager {
    presets: Vec<Box<dyn Preset>>,
}

impl PresetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `laravel` then `php`, so a Laravel app is not detected as plain PHP.
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        manager.register(Box::new(LaravelPreset));
        manager.register(Box::new(PhpPreset));
        manager
    }

    /// Add a preset. One with the same name is replaced in place.
    pub fn register(&mut self, preset: Box<dyn Preset>) {
        match self.presets.iter().position(|p| p.name() == preset.name()) {
            Some(i) => self.presets[i] = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Preset> {
        self.presets
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name()).collect()
    }

    /// The first registered preset whose detection matches `path`.
    pub fn detect_preset(&self, path: &Path) -> Option<&dyn Preset> {
        self.presets
            .iter()
            .find(|p| p.detect(path))
            .map(|p| p.as_ref())
    }
}
