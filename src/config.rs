/*
 *  config.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::omega::{OMEGA_CHECK_URL, OmegaConfig};
use crate::shift::TimezonePolicy;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.  All fields are Options so YAML and CLI
/// can be layered over the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// e.g., "info" | "debug"
    pub log_level: Option<String>,
    /// Read the shift schedule against the reference timezone rather than
    /// the host's local one.  Default true.
    pub reference_timezone: Option<bool>,
    /// Use the alternate (bee shed) banner set.  Default false.
    pub bee_shed: Option<bool>,
    pub surface: Option<SurfaceConfig>,
    pub omega: Option<OmegaSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SurfaceConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OmegaSection {
    /// Whether the override checker runs at all.  Default false.
    pub enabled: Option<bool>,
    pub check_url: Option<String>,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn timezone_policy(&self) -> TimezonePolicy {
        TimezonePolicy::from_reference_pref(self.reference_timezone.unwrap_or(true))
    }

    pub fn bee_shed(&self) -> bool {
        self.bee_shed.unwrap_or(false)
    }

    pub fn surface_size(&self) -> (u32, u32) {
        let s = self.surface.clone().unwrap_or_default();
        (s.width.unwrap_or(1280), s.height.unwrap_or(800))
    }

    pub fn omega(&self) -> OmegaConfig {
        let section = self.omega.clone().unwrap_or_default();
        OmegaConfig {
            enabled: section.enabled.unwrap_or(false),
            check_url: section.check_url.unwrap_or_else(|| OMEGA_CHECK_URL.to_string()),
        }
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "shiftwall", about = "shift banner wallpaper daemon")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Follow the host's local timezone instead of the reference zone
    #[arg(long, action = ArgAction::SetTrue)]
    pub local_timezone: bool,
    /// Use the alternate banner set
    #[arg(long, action = ArgAction::SetTrue)]
    pub bee_shed: bool,
    /// Enable the omega override checker
    #[arg(long, action = ArgAction::SetTrue)]
    pub omega: bool,
    #[arg(long)]
    pub surface_width: Option<u32>,
    #[arg(long)]
    pub surface_height: Option<u32>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with_cli(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

pub fn load_with_cli(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/shiftwall/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/shiftwall/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/shiftwall.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["shiftwall.yaml", "config.yaml", "config/shiftwall.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()           { dst.log_level = src.log_level; }
    if src.reference_timezone.is_some()  { dst.reference_timezone = src.reference_timezone; }
    if src.bee_shed.is_some()            { dst.bee_shed = src.bee_shed; }
    match (&mut dst.surface, src.surface) {
        (None, Some(c)) => dst.surface = Some(c),
        (Some(d), Some(s)) => {
            if s.width.is_some()  { d.width = s.width; }
            if s.height.is_some() { d.height = s.height; }
        }
        _ => {}
    }
    match (&mut dst.omega, src.omega) {
        (None, Some(c)) => dst.omega = Some(c),
        (Some(d), Some(s)) => {
            if s.enabled.is_some()   { d.enabled = s.enabled; }
            if s.check_url.is_some() { d.check_url = s.check_url; }
        }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.local_timezone      { cfg.reference_timezone = Some(false); }
    if cli.bee_shed            { cfg.bee_shed = Some(true); }
    if cli.omega {
        cfg.omega.get_or_insert_with(Default::default).enabled = Some(true);
    }
    if cli.surface_width.is_some() || cli.surface_height.is_some() {
        let s = cfg.surface.get_or_insert_with(Default::default);
        if cli.surface_width.is_some()  { s.width = cli.surface_width; }
        if cli.surface_height.is_some() { s.height = cli.surface_height; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let (w, h) = cfg.surface_size();
    if w == 0 || h == 0 {
        return Err(ConfigError::Validation("surface width/height must be > 0".into()));
    }
    if cfg.omega().check_url.is_empty() {
        return Err(ConfigError::Validation("omega check_url must not be empty".into()));
    }
    if let Some(level) = cfg.log_level.as_deref() {
        match level {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(ConfigError::Validation(format!("unknown log level: {other}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.timezone_policy(), TimezonePolicy::Reference);
        assert!(!cfg.bee_shed());
        assert!(!cfg.omega().enabled);
        assert_eq!(cfg.omega().check_url, OMEGA_CHECK_URL);
        assert_eq!(cfg.surface_size(), (1280, 800));
    }

    #[test]
    fn test_yaml_merge_over_defaults() {
        let yaml = r#"
log_level: debug
reference_timezone: false
omega:
  enabled: true
surface:
  height: 600
"#;
        let mut cfg = Config::default();
        merge(&mut cfg, serde_yaml::from_str(yaml).unwrap());
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.timezone_policy(), TimezonePolicy::SystemLocal);
        assert!(cfg.omega().enabled);
        // Unset fields keep their defaults.
        assert_eq!(cfg.surface_size(), (1280, 600));
        assert_eq!(cfg.omega().check_url, OMEGA_CHECK_URL);
    }

    #[test]
    fn test_cli_wins_over_yaml() {
        let yaml = "reference_timezone: true\n";
        let mut cfg = Config::default();
        merge(&mut cfg, serde_yaml::from_str(yaml).unwrap());
        let cli = Cli::parse_from(["shiftwall", "--local-timezone", "--bee-shed"]);
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.timezone_policy(), TimezonePolicy::SystemLocal);
        assert!(cfg.bee_shed());
    }

    #[test]
    fn test_validation_rejects_zero_surface() {
        let cfg = Config {
            surface: Some(SurfaceConfig { width: Some(0), height: Some(100) }),
            ..Default::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let cfg = Config { log_level: Some("loud".into()), ..Default::default() };
        assert!(validate(&cfg).is_err());
    }
}
