//! Interpolation of captured answers into scripted messages.

use std::collections::BTreeMap;

use minijinja::Environment;

/// Renders `{{ firstName }}`-style message templates.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Render `text` with the answers in scope, plus `response` bound to the
    /// visitor's reply when there is one. Unknown names render empty; a
    /// malformed template is logged and returned unrendered.
    pub fn render(
        &self,
        text: &str,
        answers: &BTreeMap<String, String>,
        response: Option<&str>,
    ) -> String {
        if !text.contains("{{") && !text.contains("{%") {
            return text.to_string();
        }

        let mut ctx: BTreeMap<&str, &str> = answers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(response) = response {
            ctx.insert("response", response);
        }

        match self.env.render_str(text, ctx) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to render message template");
                text.to_string()
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
