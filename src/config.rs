//! Configuration loading from verse.toml.
//!
//! Every section is optional; anything left out keeps its default.
//!
//! ## Example
//!
//! ```toml
//! output = "runs"
//!
//! [particles]
//! size = 16
//! runs = [{ name = "verse", particles = 4, noise = 0.5 }]
//!
//! [contra.optimizer]
//! iterations = 256
//!
//! [multi]
//! end = 32
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, VerseError};
use crate::experiments::{ConnectConfig, ContraConfig, ParticlesConfig, QuantumConfig};
use crate::training::GrowthConfig;

pub const CONFIG_FILE: &str = "verse.toml";

/// Verse configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Source file for this config (for display).
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Directory that charts, animations and artifacts are written to.
    pub output: PathBuf,

    pub particles: ParticlesConfig,
    pub verse: QuantumConfig,
    pub multi: GrowthConfig,
    pub contra: ContraConfig,
    pub connect: ConnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            output: PathBuf::from("."),
            particles: ParticlesConfig::default(),
            verse: QuantumConfig::default(),
            multi: GrowthConfig::default(),
            contra: ContraConfig::default(),
            connect: ConnectConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the given directory.
    ///
    /// A missing verse.toml gives the defaults. A present but malformed
    /// one is an error rather than being silently ignored.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, source: PathBuf) -> Result<Self> {
        let mut config: Config = toml::from_str(content).map_err(|e| VerseError::Config {
            path: source.display().to_string(),
            message: e.to_string(),
        })?;
        config.particles.validate(&source.display().to_string())?;
        config.source = Some(source);
        Ok(config)
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ref source) = self.source {
            lines.push(format!("   Config: {}", source.display()));
        } else {
            lines.push("   Config: (defaults)".to_string());
        }
        lines.push(format!("   Output: {}", self.output.display()));

        let runs: Vec<_> = self
            .particles
            .runs
            .iter()
            .map(|r| format!("{}×{}@{}", r.name, r.particles, r.noise))
            .collect();
        lines.push(format!(
            "   Particles: {}² grid, {} iterations, runs {}",
            self.particles.size,
            self.particles.optimizer.iterations,
            runs.join(", ")
        ));
        lines.push(format!(
            "   Verse: width {}, {} iterations",
            self.verse.width, self.verse.optimizer.iterations
        ));
        lines.push(format!("   Multi: widths {}..{}", self.multi.start, self.multi.end));
        lines.push(format!(
            "   Contra: width {}, {} iterations",
            self.contra.width, self.contra.optimizer.iterations
        ));
        lines.push(format!(
            "   Connect: {}×{}, {} steps",
            self.connect.size, self.connect.size, self.connect.steps
        ));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output, PathBuf::from("."));
        assert_eq!(config.particles.width(), 1024);
        assert_eq!(config.multi.end, 128);
        assert!(config.display_summary().contains("(defaults)"));
    }

    #[test]
    fn test_partial_overrides() {
        let toml = r#"
            output = "runs"

            [contra.optimizer]
            iterations = 64

            [multi]
            end = 16

            [particles]
            runs = [{ name = "solo", particles = 1, noise = 0.5 }]
        "#;
        let config = Config::parse(toml, PathBuf::from("verse.toml")).unwrap();
        assert_eq!(config.output, PathBuf::from("runs"));
        assert_eq!(config.contra.optimizer.iterations, 64);
        // Untouched optimizer fields fall back to the general defaults.
        assert_eq!(config.contra.optimizer.eta, 0.3);
        assert_eq!(config.contra.width, 8);
        assert_eq!(config.multi.end, 16);
        assert_eq!(config.multi.start, 2);
        assert_eq!(config.particles.runs.len(), 1);
        assert_eq!(config.particles.size, 32);
        assert_eq!(config.connect, ConnectConfig::default());
    }

    #[test]
    fn test_load_reads_directory_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[connect]\nsteps = 10\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.connect.steps, 10);
        assert_eq!(config.source, Some(dir.path().join(CONFIG_FILE)));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = Config::parse("[verse]\nwidth = \"wide\"\n", PathBuf::from("verse.toml"))
            .unwrap_err();
        assert!(matches!(err, VerseError::Config { .. }));
    }

    #[test]
    fn test_zero_grid_is_rejected() {
        for toml in ["[particles]\nsize = 0\n", "[particles]\nscale = 0\n"] {
            let err = Config::parse(toml, PathBuf::from("verse.toml")).unwrap_err();
            match err {
                VerseError::Config { path, message } => {
                    assert_eq!(path, "verse.toml");
                    assert!(message.starts_with("particles."));
                }
                other => panic!("unexpected error {other}"),
            }
        }
    }
}
