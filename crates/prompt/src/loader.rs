//! Prompt loader for YAML prompt definitions.
//!
//! Workspace files under `.lectern/prompts/` override the built-ins of the
//! same id.

use crate::builtin::{builtin_ids, builtin_prompt};
use crate::types::PromptDefinition;
use lectern_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".lectern").join("prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.lectern/prompts/` directory.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.lectern/`
/// * `prompt_id` - Prompt identifier (e.g., "compose.day")
///
/// # Example
/// ```no_run
/// use lectern_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "compose.day")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Workspace override if present, else the built-in.
///
/// Returns the definition and whether it came from the workspace. A
/// workspace file that exists but is invalid is an error rather than a
/// silent fallback.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<(PromptDefinition, bool)> {
    if prompts_dir(workspace_path)
        .join(format!("{}.yml", prompt_id))
        .exists()
    {
        return Ok((load_prompt(workspace_path, prompt_id)?, true));
    }
    Ok((builtin_prompt(prompt_id)?, false))
}

/// List all available prompt IDs: built-ins plus workspace files.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids = builtin_ids();
    let dir = prompts_dir(workspace_path);

    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::COMPOSE_DAY;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, body: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", id)), body).unwrap();
    }

    fn valid_yaml(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Override"
apiVersion: "1.0"
behavior:
  tone: plain
  style: short
system: "Be brief."
template: "Reflect on {{{{anchor.scriptureReference}}}}"
output:
  format: json
"#,
            id
        )
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "custom", &valid_yaml("custom"));

        let prompt = load_prompt(temp_dir.path(), "custom").unwrap();
        assert_eq!(prompt.title, "Override");
        assert_eq!(prompt.template, "Reflect on {{anchor.scriptureReference}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_invalid_override_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), COMPOSE_DAY, "invalid: yaml: content:");
        assert!(resolve_prompt(temp_dir.path(), COMPOSE_DAY).is_err());
    }

    #[test]
    fn test_resolve_prefers_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let (builtin, overridden) = resolve_prompt(temp_dir.path(), COMPOSE_DAY).unwrap();
        assert!(!overridden);
        assert_eq!(builtin.id, COMPOSE_DAY);

        write_prompt(temp_dir.path(), COMPOSE_DAY, &valid_yaml(COMPOSE_DAY));
        let (custom, overridden) = resolve_prompt(temp_dir.path(), COMPOSE_DAY).unwrap();
        assert!(overridden);
        assert_eq!(custom.title, "Override");
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "prompt1", &valid_yaml("prompt1"));
        write_prompt(temp_dir.path(), COMPOSE_DAY, &valid_yaml(COMPOSE_DAY));

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec![COMPOSE_DAY.to_string(), "prompt1".to_string()]);
    }
}
