//! Prompts compiled into the binary.

use lectern_core::{AppError, AppResult};

use crate::types::PromptDefinition;

/// Identifier of the day composition prompt.
pub const COMPOSE_DAY: &str = "compose.day";

const BUILTINS: &[(&str, &str)] = &[(COMPOSE_DAY, include_str!("compose.day.yml"))];

/// Ids of every built-in prompt.
pub fn builtin_ids() -> Vec<String> {
    BUILTINS.iter().map(|(id, _)| id.to_string()).collect()
}

/// Parse the built-in prompt `id`.
pub fn builtin_prompt(id: &str) -> AppResult<PromptDefinition> {
    let (_, yaml) = BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == id)
        .ok_or_else(|| AppError::Prompt(format!("No built-in prompt named '{}'", id)))?;

    serde_yaml::from_str(yaml)
        .map_err(|e| AppError::Prompt(format!("Built-in prompt '{}' is invalid: {}", id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prompt_parses() {
        let def = builtin_prompt(COMPOSE_DAY).unwrap();
        assert_eq!(def.id, COMPOSE_DAY);
        assert_eq!(def.output.format, "json");
        assert!(def.system.unwrap().contains("{{wordTarget}}"));
        assert!(def.template.contains("{{#each chunks}}"));
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_prompt("nope").is_err());
    }
}
