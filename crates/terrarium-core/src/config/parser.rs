//! JSON config parser with helpful error messages

use super::schema::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse terrarium.json with detailed error messages
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found at {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse config content from string
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config =
        serde_json::from_str(content).map_err(|e| enhance_json_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Attach the offending source lines to a JSON error
fn enhance_json_error(error: serde_json::Error, content: &str) -> anyhow::Error {
    let line_num = error.line();
    if line_num == 0 {
        return anyhow::anyhow!("JSON parsing error: {}", error);
    }

    let context = get_line_context(content, line_num);
    anyhow::anyhow!(
        "JSON parsing error at line {}, column {}:\n{}\n\nError: {}",
        line_num,
        error.column(),
        context,
        error
    )
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
