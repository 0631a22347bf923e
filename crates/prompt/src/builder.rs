//! Prompt builder: renders a definition's templates with a context.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use lectern_core::{AppError, AppResult};
use serde::Serialize;

/// Build a prompt from a definition and a serializable context.
///
/// Both the system and the user template are rendered against the same
/// context. Output is not HTML-escaped; missing variables render empty.
///
/// # Arguments
/// * `definition` - Prompt definition (built-in or workspace)
/// * `context` - Any serializable value; its fields become template variables
/// * `workspace_override` - Recorded in metadata
///
/// # Example
/// ```no_run
/// use lectern_prompt::{build_prompt, builtin_prompt};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt("compose.day")?;
/// let ctx = serde_json::json!({ "wordTarget": 1500, "userResponse": "Tired." });
/// let built = build_prompt(&def, &ctx, false)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt<C: Serialize>(
    definition: &PromptDefinition,
    context: &C,
    workspace_override: bool,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let system = match &definition.system {
        Some(template) => render(&mut handlebars, "system", template, context)?,
        None => String::new(),
    };
    let user = render(&mut handlebars, "user", &definition.template, context)?;

    Ok(BuiltPrompt {
        system: system.trim().to_string(),
        user: user.trim().to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            workspace_override,
            output_format: definition.output.format.clone(),
        },
    })
}

fn render<C: Serialize>(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    context: &C,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register {} template: {}", name, e)))?;

    handlebars
        .render(name, context)
        .map_err(|e| AppError::Prompt(format!("Failed to render {} template: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{builtin_prompt, COMPOSE_DAY};
    use crate::types::{PromptBehavior, PromptOutputSpec};
    use serde_json::json;

    fn definition(system: Option<&str>, template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior {
                tone: "plain".to_string(),
                style: "short".to_string(),
            },
            system: system.map(str::to_string),
            template: template.to_string(),
            output: PromptOutputSpec {
                format: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_render_simple_template() {
        let def = definition(Some("Write {{words}} words."), "Question: {{prompt}}");
        let built = build_prompt(&def, &json!({ "prompt": "Hello & welcome", "words": 300 }), false)
            .unwrap();
        assert_eq!(built.system, "Write 300 words.");
        assert_eq!(built.user, "Question: Hello & welcome");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let def = definition(None, "Question: {{missing}}");
        let built = build_prompt(&def, &json!({}), true).unwrap();
        assert_eq!(built.user, "Question:");
        assert!(built.system.is_empty());
        assert!(built.metadata.workspace_override);
    }

    #[test]
    fn test_malformed_template_is_an_error() {
        let def = definition(None, "{{#each items}}");
        assert!(build_prompt(&def, &json!({}), false).is_err());
    }

    #[test]
    fn test_compose_prompt_lists_chunks() {
        let def = builtin_prompt(COMPOSE_DAY).unwrap();
        let ctx = json!({
            "wordTarget": 1500,
            "reflectionWords": 1050,
            "dayNumber": 2,
            "userResponse": "I feel restless.",
            "anchor": { "dayTitle": "Still Waters", "scriptureReference": "Psalm 23:2" },
            "chunks": [
                { "ordinal": 1, "sourceType": "commentary", "title": "Henry on Psalm 23", "content": "He leads me." }
            ]
        });
        let built = build_prompt(&def, &ctx, false).unwrap();

        assert!(built.system.contains("~1500 words"));
        assert!(built.user.contains("[1. commentary: Henry on Psalm 23]"));
        assert!(built.user.contains("Anchor in: Psalm 23:2"));
        assert!(!built.user.contains("No reference library material"));
    }

    #[test]
    fn test_compose_prompt_without_chunks() {
        let def = builtin_prompt(COMPOSE_DAY).unwrap();
        let built = build_prompt(&def, &json!({ "chunks": [] }), false).unwrap();
        assert!(built.user.contains("No reference library material was available"));
    }
}
