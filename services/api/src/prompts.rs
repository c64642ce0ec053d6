//! Persona overrides loaded from the prompts directory.

use anyhow::Context;
use std::{collections::HashMap, fs, path::Path};
use tracing::{info, warn};

/// Reads every `*.md` file in `prompts_path`, keyed by file stem.
///
/// A missing directory is not an error; the built-in personas are used instead.
pub fn load_prompts(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    if !prompts_path.is_dir() {
        warn!(path = %prompts_path.display(), "Prompts directory not found, using built-in personas");
        return Ok(prompts);
    }

    for entry in fs::read_dir(prompts_path)
        .with_context(|| format!("Failed to read prompts directory {}", prompts_path.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt {}", path.display()))?;
            info!(prompt = %prompt_key, "Loaded prompt override");
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}
