//! Persona loader for YAML persona overrides.

use crate::types::PersonaDefinition;
use std::path::Path;
use yatri_core::{AppError, AppResult};

const PERSONAS_DIR: &str = ".yatri/prompts";

/// Load a persona definition by ID from the workspace.
///
/// Looks for `<id>.yml` in the `.yatri/prompts/` directory.
///
/// # Example
/// ```no_run
/// use yatri_prompt::load_persona;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let persona = load_persona(Path::new("."), "yatri.concise")?;
/// println!("Loaded persona: {}", persona.title);
/// # Ok(())
/// # }
/// ```
pub fn load_persona(workspace_path: &Path, persona_id: &str) -> AppResult<PersonaDefinition> {
    let persona_file = workspace_path
        .join(PERSONAS_DIR)
        .join(format!("{}.yml", persona_id));

    tracing::debug!("Loading persona from: {:?}", persona_file);

    if !persona_file.exists() {
        return Err(AppError::Prompt(format!(
            "Persona file not found: {:?}",
            persona_file
        )));
    }

    let contents = std::fs::read_to_string(&persona_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read persona file {:?}: {}",
            persona_file, e
        ))
    })?;

    let definition: PersonaDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse persona YAML {:?}: {}",
            persona_file, e
        ))
    })?;

    validate_persona(&definition)?;

    tracing::info!("Loaded persona: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all persona IDs available in the workspace, sorted.
pub fn list_personas(workspace_path: &Path) -> AppResult<Vec<String>> {
    let personas_dir = workspace_path.join(PERSONAS_DIR);

    if !personas_dir.exists() {
        return Ok(Vec::new());
    }

    let mut persona_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&personas_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                persona_ids.push(stem.to_string());
            }
        }
    }

    persona_ids.sort();
    Ok(persona_ids)
}

/// Resolve the persona to use: a workspace override when an ID is given,
/// the built-in Yatri persona otherwise.
pub fn resolve_persona(
    workspace_path: &Path,
    persona_id: Option<&str>,
) -> AppResult<PersonaDefinition> {
    match persona_id {
        Some(id) => load_persona(workspace_path, id),
        None => Ok(PersonaDefinition::yatri()),
    }
}

fn validate_persona(def: &PersonaDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Persona ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Persona title cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.instructions.trim().is_empty() {
        return Err(AppError::Prompt(
            "Persona instructions cannot be empty".to_string(),
        ));
    }

    Ok(())
}
