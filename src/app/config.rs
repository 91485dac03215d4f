use crate::app::models::{Project, ProjectConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "cflconf.json";
pub const DEFAULT_OUTPUT_FILE: &str = "index.cfl";
pub const DEFAULT_EXCLUDE: [&str; 4] = [".git", "node_modules", DEFAULT_OUTPUT_FILE, CONFIG_FILE];

#[derive(Deserialize, Debug)]
struct PresetsFile {
    #[serde(flatten)]
    presets: HashMap<String, PresetConfig>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PresetConfig {
    pub exclude: Option<Vec<String>>,
    pub exclude_globs: Option<Vec<String>>,
}

/// `~/.config/cfl/presets.toml`
fn presets_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("cfl").join("presets.toml"))
}

fn load_presets_file(path: &Path) -> Result<HashMap<String, PresetConfig>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content =
        fs::read_to_string(path).context(format!("Failed to read presets at {:?}", path))?;

    let parsed: PresetsFile = toml::from_str(&content).context("Failed to parse presets.toml")?;

    Ok(parsed.presets)
}

/// Appends `extra` to `base`, dropping repeats while keeping first-seen order.
fn merge_vecs(base: Vec<String>, extra: Option<Vec<String>>) -> Vec<String> {
    let mut combined = base;
    if let Some(mut items) = extra {
        combined.append(&mut items);
    }
    let mut seen = std::collections::HashSet::new();
    combined.retain(|item| seen.insert(item.clone()));
    combined
}

pub fn load_project_config(path: &Path) -> Result<ProjectConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config at {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

pub fn save_project_config(path: &Path, config: &ProjectConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write config at {:?}", path))
}

/// Folds a preset and command-line excludes into the stored configuration.
pub fn merge_config(
    mut config: ProjectConfig,
    preset: PresetConfig,
    cli_exclude: Option<Vec<String>>,
) -> ProjectConfig {
    config.exclude = merge_vecs(merge_vecs(config.exclude, preset.exclude), cli_exclude);
    config.exclude_globs = merge_vecs(config.exclude_globs, preset.exclude_globs);
    config
}

/// Builds the run context. Preset choice: explicit name > project folder name > none.
pub fn resolve_project(
    config_path: &Path,
    preset: Option<&str>,
    project_name: Option<&str>,
    cli_exclude: Option<Vec<String>>,
) -> Result<Project> {
    let config = load_project_config(config_path)?;
    let presets = load_presets_file(&presets_path()?)?;

    let preset_key = preset.or(project_name);
    let preset = preset_key
        .and_then(|k| presets.get(k))
        .cloned()
        .unwrap_or_default();

    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(Project::new(base, merge_config(config, preset, cli_exclude)))
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("Failed to read answer")?;
    Ok(answer.trim().to_string())
}

/// Asks for the input directory and bundle name, then writes the config.
pub fn init<R: BufRead, W: Write>(
    config_path: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<ProjectConfig> {
    let base = config_path.parent().unwrap_or(Path::new(""));
    let default_input = if base.join("src").is_dir() { "src" } else { "." };

    let input_dir = ask(
        input,
        output,
        &format!("Input Directory (default: {}): ", default_input),
    )?;
    let output_file = ask(
        input,
        output,
        &format!("Filename (default: {}): ", DEFAULT_OUTPUT_FILE),
    )?;

    let config = ProjectConfig {
        input_dir: if input_dir.is_empty() {
            default_input.to_string()
        } else {
            input_dir
        },
        output_file: if output_file.is_empty() {
            DEFAULT_OUTPUT_FILE.to_string()
        } else {
            output_file
        },
        exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        exclude_globs: Vec::new(),
    };

    save_project_config(config_path, &config)?;
    log::info!("Wrote {:?}", config_path);
    Ok(config)
}
