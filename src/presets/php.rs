use super::Preset;
use crate::config::StepConfig;
use std::path::Path;

/// Any Composer project.
pub struct PhpPreset;

impl Preset for PhpPreset {
    fn name(&self) -> &str {
        "php"
    }

    fn detect(&self, path: &Path) -> bool {
        path.join("composer.json").is_file()
    }

    fn scaffold_steps(&self) -> Vec<StepConfig> {
        vec![StepConfig::named("php.composer").with_args(&["install", "--no-interaction"])]
    }
}
