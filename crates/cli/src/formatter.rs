use clap::ValueEnum;
use colored::*;
use http::StatusCode;
use loopback_rest_crud::{BootReport, Route};
use serde_json::Value;

/// How `invoke` and `batch` print a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `{"status": .., "body": ..}` on one line
    Json,
    /// Status and body on one line
    Compact,
    /// Status line, then the indented body
    Pretty,
}

/// When status lines, routes and boot results are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorWhen {
    /// Only when stdout supports color
    Auto,
    Always,
    Never,
}

impl ColorWhen {
    pub fn enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => supports_color::on(supports_color::Stream::Stdout).is_some(),
        }
    }
}

fn format_status(status: StatusCode, colorize: bool) -> String {
    let text = status.to_string();
    if !colorize {
        return text;
    }
    if status.is_success() {
        text.green().bold().to_string()
    } else if status.is_client_error() {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

fn format_body(body: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => {
            serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
        }
        OutputFormat::Json | OutputFormat::Compact => body.to_string(),
    }
}

/// Format a handled request in the chosen [`OutputFormat`].
pub fn format_response(
    status: StatusCode,
    body: Option<&Value>,
    format: OutputFormat,
    colorize: bool,
) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "status": status.as_u16(),
            "body": body,
        })
        .to_string(),
        OutputFormat::Compact | OutputFormat::Pretty => {
            let status = format_status(status, colorize);
            let separator = if format == OutputFormat::Compact { " " } else { "\n" };
            match body {
                Some(body) => format!("{}{}{}", status, separator, format_body(body, format)),
                None => status,
            }
        }
    }
}

pub fn format_route(route: &Route, colorize: bool) -> String {
    if !colorize {
        return route.to_string();
    }
    format!(
        "{:<7} {:<24} {}.{}",
        route.method.as_str().bold(),
        route.path,
        route.controller.bright_blue(),
        route.operation.name()
    )
}

/// Format boot results: one line per artefact, then a summary
pub fn format_boot_report(report: &BootReport, colorize: bool) -> String {
    let mut lines = Vec::new();
    for loaded in &report.loaded {
        if colorize {
            lines.push(format!("{} {}", "+".green().bold(), loaded));
        } else {
            lines.push(format!("+ {}", loaded));
        }
    }
    for failure in &report.failures {
        if colorize {
            lines.push(format!("{} {}", "!".red().bold(), failure));
        } else {
            lines.push(format!("! {}", failure));
        }
    }
    lines.push(format!(
        "{} loaded, {} failed",
        report.loaded.len(),
        report.failures.len()
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn formats_responses_without_color() {
        let body = json!({"count": 2});
        assert_eq!(
            format_response(StatusCode::OK, Some(&body), OutputFormat::Compact, false),
            "200 OK {\"count\":2}"
        );
        assert_eq!(
            format_response(StatusCode::NO_CONTENT, None, OutputFormat::Pretty, false),
            "204 No Content"
        );
        assert_eq!(
            format_response(StatusCode::NOT_FOUND, None, OutputFormat::Json, false),
            "{\"body\":null,\"status\":404}"
        );
    }

    #[test]
    fn pretty_puts_the_body_below_the_status() {
        let body = json!({"id": 1});
        assert_eq!(
            format_response(StatusCode::OK, Some(&body), OutputFormat::Pretty, false),
            "200 OK\n{\n  \"id\": 1\n}"
        );
    }

    #[test]
    fn explicit_color_choices_ignore_the_terminal() {
        assert!(!ColorWhen::Never.enabled());
        assert!(ColorWhen::Always.enabled());
        assert_eq!(OutputFormat::from_str("JSON", true), Ok(OutputFormat::Json));
        assert!(OutputFormat::from_str("whatever", true).is_err());
    }

    #[test]
    fn summarizes_boot_report() {
        let report = BootReport {
            loaded: vec!["models.Product".to_string()],
            failures: Vec::new(),
        };
        assert_eq!(
            format_boot_report(&report, false),
            "+ models.Product\n1 loaded, 0 failed"
        );
    }
}
