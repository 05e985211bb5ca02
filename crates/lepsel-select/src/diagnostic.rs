//! Structured diagnostics for recoverable, per-predicate problems.

use std::fmt;

use serde::Serialize;

/// Component that raised a diagnostic; rendered as the `[tag]` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Shorthand cut compiler.
    Cut,
    /// Macro expansion.
    Macro,
    /// Derived-variable validation.
    Validate,
    /// Selection plans.
    Plan,
}

impl Component {
    /// Tag without brackets.
    pub fn tag(self) -> &'static str {
        match self {
            Component::Cut => "cut",
            Component::Macro => "macro",
            Component::Validate => "validate",
            Component::Plan => "plan",
        }
    }
}

/// Severity. Neither level aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// The input was used, with a caveat.
    Warning,
    /// The input was dropped.
    Error,
}

/// One log-worthy finding about a specific input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Raising component.
    pub component: Component,
    /// Severity.
    pub level: Level,
    /// The offending input (token, expression, name).
    pub subject: String,
    /// What went wrong.
    pub message: String,
    /// Suggested fixes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl Diagnostic {
    /// A warning about `subject`.
    pub fn warning(component: Component, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self { component, level: Level::Warning, subject: subject.into(), message: message.into(), hints: Vec::new() }
    }

    /// An error about `subject`.
    pub fn error(component: Component, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self { component, level: Level::Error, subject: subject.into(), message: message.into(), hints: Vec::new() }
    }

    /// Attach a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Send to the `log` facade at the matching level.
    pub fn emit(&self) {
        match self.level {
            Level::Warning => log::warn!("{self}"),
            Level::Error => log::error!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.component.tag(), self.message)?;
        for hint in &self.hints {
            write!(f, "\n  HINT: {hint}")?;
        }
        Ok(())
    }
}

/// Emit every diagnostic in order.
pub(crate) fn emit_all(diagnostics: &[Diagnostic]) {
    diagnostics.iter().for_each(Diagnostic::emit);
}
