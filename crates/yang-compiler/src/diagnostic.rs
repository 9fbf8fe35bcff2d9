//! Pretty-printable reports for loader errors that reference module source.
//!
//! [`render`] builds a labelled source snippet for an [`Error`] whose
//! location survived into the error record. Callers keep the source text;
//! the repository does not retain it after a load.

use ariadne::{Config, Label, Report, ReportKind};

use crate::error::Error;

/// Render an error as a labelled source report, without colors so the
/// output is stable in logs and tests.
pub fn render(error: &Error, filename: &str, source: &str) -> String {
    if source.is_empty() {
        return error.to_string();
    }
    let mut offset = error.loc.unwrap_or(0).min(source.len() - 1);
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    // Label to the end of the offending token.
    let mut end = source[offset..]
        .find(char::is_whitespace)
        .map(|i| offset + i)
        .unwrap_or(source.len());
    if end <= offset {
        end = source.len();
    }

    let id = filename.to_string();
    let mut builder = Report::build(ReportKind::Error, id.clone(), offset)
        .with_config(Config::default().with_color(false))
        .with_message(error.kind.to_string());

    let mut label = Label::new((id.clone(), offset..end));
    if let Some(path) = &error.path {
        label = label.with_message(format!("at {path}"));
    }
    builder = builder.with_label(label);

    let mut buffer = Vec::new();
    let _ = builder
        .finish()
        .write(ariadne::sources([(id, source.to_string())]), &mut buffer);
    String::from_utf8(buffer).unwrap_or_else(|_| error.to_string())
}
