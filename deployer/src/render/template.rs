//! Placeholder substitution for deployment script templates
//!
//! Templates are shell scripts containing `{{.Field}}` placeholders, with
//! optional spaces inside the braces. The Go template trim markers
//! (`{{- .Field -}}`) and comments (`{{/* ... */}}`) are understood; any other
//! action is rejected. Values are inserted verbatim: no quoting or escaping
//! is applied, the configuration is operator input.

use crate::errors::DeployError;
use crate::models::config::DeploymentConfig;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Substitute every placeholder in `template` with its configuration value
pub fn render(template: &str, config: &DeploymentConfig) -> Result<String, DeployError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let line = line_of(template, rest, start);
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open.find(CLOSE).ok_or_else(|| {
            DeployError::RenderError(format!("unclosed placeholder at line {}", line))
        })?;

        let (action, trim_left, trim_right) = trim_markers(&after_open[..end]);
        if trim_left {
            output.truncate(output.trim_end().len());
        }
        rest = &after_open[end + CLOSE.len()..];
        if trim_right {
            rest = rest.trim_start();
        }

        let action = action.trim();
        if action.starts_with("/*") && action.ends_with("*/") {
            continue;
        }
        let name = action.strip_prefix('.').ok_or_else(|| {
            DeployError::RenderError(format!(
                "unsupported template action `{{{{{}}}}}` at line {}",
                action, line
            ))
        })?;
        let value = config.field(name).ok_or_else(|| {
            DeployError::RenderError(format!(
                "template references unknown field `{}` at line {}",
                name, line
            ))
        })?;
        output.push_str(value);
    }

    output.push_str(rest);
    Ok(output)
}

/// Split `{{- x -}}` style markers off an action
///
/// A marker is a dash separated from the action by whitespace.
fn trim_markers(action: &str) -> (&str, bool, bool) {
    let (action, left) = match action.strip_prefix('-') {
        Some(inner) if inner.starts_with(char::is_whitespace) => (inner, true),
        _ => (action, false),
    };
    let (action, right) = match action.strip_suffix('-') {
        Some(inner) if inner.ends_with(char::is_whitespace) => (inner, true),
        _ => (action, false),
    };
    (action, left, right)
}

/// 1-based line of `offset` within `rest`, where `rest` is a suffix of `template`
fn line_of(template: &str, rest: &str, offset: usize) -> usize {
    let consumed = template.len() - rest.len() + offset;
    template[..consumed].matches('\n').count() + 1
}
