//! Error message formatting with actionable suggestions.

use std::error::Error;

use sprig_core::error::SprigError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
#[derive(Debug)]
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its kind, per-dependency failures, suggestion and cause chain
    pub fn format_error(&self, error: &SprigError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(&self.colors.dim(&format!("[{}]", error.kind())));
        output.push_str(": ");

        match error.root() {
            SprigError::PartialDependencyFailure {
                package,
                succeeded,
                failures,
            } => {
                output.push_str(&format!(
                    "{} of {} dependencies of {} failed to download",
                    failures.len(),
                    succeeded + failures.len(),
                    package
                ));
                for failure in failures {
                    output.push_str(&format!(
                        "\n  - {}@{}: {}",
                        failure.name, failure.constraint, failure.error
                    ));
                }
            },
            _ => output.push_str(&error.to_string()),
        }
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
