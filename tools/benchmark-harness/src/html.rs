//! HTML output for parser comparisons
//!
//! Renders a single static page with the comparison table and rankings. The
//! template is embedded at compile time.

use crate::docvqa::comparison::{Comparison, Ranking};
use crate::{Error, Result};
use minijinja::{AutoEscape, Environment, context};
use std::fs;
use std::path::Path;

const COMPARISON_TEMPLATE: &str = "comparison.html.jinja";

fn template_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template(COMPARISON_TEMPLATE, include_str!("../templates/comparison.html.jinja"))
        .map_err(|e| Error::Template(format!("Failed to add comparison template: {}", e)))?;
    env.set_auto_escape_callback(|name| {
        if name.ends_with(".html.jinja") {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });
    Ok(env)
}

/// Render a comparison as a standalone HTML page
pub fn render_comparison(comparison: &Comparison, title: &str) -> Result<String> {
    let rankings: Vec<(&str, Option<&Ranking>)> = vec![
        ("Fastest", comparison.fastest.as_ref()),
        ("Best exact match", comparison.most_accurate_exact.as_ref()),
        ("Best similarity", comparison.most_accurate_similarity.as_ref()),
        ("Best ANLS", comparison.best_anls.as_ref()),
        ("Best MAP", comparison.best_map.as_ref()),
    ];

    let env = template_env()?;
    let template = env
        .get_template(COMPARISON_TEMPLATE)
        .map_err(|e| Error::Template(format!("Template not found: {}", e)))?;
    template
        .render(context! { title => title, comparison => comparison, rankings => rankings })
        .map_err(|e| Error::Template(format!("Template render failed: {}", e)))
}

/// Write a comparison page to `output_path`
pub fn write_html(comparison: &Comparison, title: &str, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(Error::Io)?;
    }

    let html = render_comparison(comparison, title)?;
    fs::write(output_path, html).map_err(Error::Io)?;

    Ok(())
}
