//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`)
//! so operators can tune expert prompting without recompiling. The
//! engine renders the filtered view, the retrieved memories, and the
//! bundle schema description into a structured prompt.

use minijinja::Environment;

use crate::error::RunnerError;

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with all prediction templates
/// pre-loaded. Templates can be edited on disk and are picked up on the
/// next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the expert's persona and task.
    pub system: String,
    /// User message containing identity, game data, memories, and the
    /// schema description.
    pub user: String,
}

/// Template filenames the engine requires.
const TEMPLATE_FILES: [(&str, &str); 5] = [
    ("system", "system.j2"),
    ("identity", "identity.j2"),
    ("gamedata", "gamedata.j2"),
    ("memories", "memories.j2"),
    ("schema", "schema.j2"),
];

impl PromptEngine {
    /// Create a new prompt engine loading templates from the directory.
    ///
    /// The directory must contain: `system.j2`, `identity.j2`,
    /// `gamedata.j2`, `memories.j2`, `schema.j2`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] when a file is missing or does
    /// not parse.
    pub fn new(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, filename) in TEMPLATE_FILES {
            let source = load_template(templates_dir, filename)?;
            env.add_template_owned(name.to_owned(), source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render the full prediction prompt.
    ///
    /// `context` carries the serialized filtered view, memories, and
    /// expert identity as one JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] on any render failure.
    pub fn render(&self, context: &serde_json::Value) -> Result<RenderedPrompt, RunnerError> {
        let render_one = |name: &str| -> Result<String, RunnerError> {
            self.env
                .get_template(name)
                .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
                .render(context)
                .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
        };

        let system = render_one("system")?;
        let identity = render_one("identity")?;
        let gamedata = render_one("gamedata")?;
        let memories = render_one("memories")?;
        let schema = render_one("schema")?;

        let user = format!("{identity}\n\n{gamedata}\n\n{memories}\n\n{schema}");

        Ok(RenderedPrompt { system, user })
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}
