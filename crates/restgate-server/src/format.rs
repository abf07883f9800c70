//! Output-format rendering.
//!
//! Formats are a fixed enumeration mapped through an explicit table to
//! renderer functions; there is no name-based dispatch. JSON is the
//! default; XML, CSV and HTML exist for callers that ask for them via
//! the `format` query parameter.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;

/// Errors produced while rendering a response body.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("output rendering failed: {0}")]
    Render(String),
}

impl FormatError {
    fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Xml,
    Csv,
    Html,
}

impl OutputFormat {
    /// Resolves a format name; `None` for anything outside the table.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    /// MIME type served for this format.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "text/xml; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
        }
    }

    /// File extension used for attachment downloads.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Csv => "csv",
            Self::Html => "html",
        }
    }
}

/// Renders `data` in the given format.
///
/// # Errors
///
/// Returns [`FormatError`] when the renderer cannot produce output;
/// the caller maps this to a 500.
pub fn render(format: OutputFormat, data: &Value) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => render_json(data),
        OutputFormat::Xml => render_xml(data),
        OutputFormat::Csv => render_csv(data),
        OutputFormat::Html => Ok(render_html(data)),
    }
}

fn render_json(data: &Value) -> Result<String, FormatError> {
    serde_json::to_string(data).map_err(|e| FormatError::render(e.to_string()))
}

// =============================================================================
// XML
// =============================================================================

fn render_xml(data: &Value) -> Result<String, FormatError> {
    let mut writer = Writer::new(Vec::new());
    write_xml_value(&mut writer, "data", data)?;
    String::from_utf8(writer.into_inner()).map_err(|e| FormatError::render(e.to_string()))
}

fn write_xml_value(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), FormatError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| FormatError::render(e.to_string()))?;

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                write_xml_value(writer, element_name(key), child)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                write_xml_value(writer, "item", item)?;
            }
        }
        Value::Null => {}
        scalar => {
            let text = scalar_string(scalar);
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(|e| FormatError::render(e.to_string()))?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| FormatError::render(e.to_string()))
}

/// JSON keys are not always valid XML element names; anything that is
/// not falls back to `item`.
fn element_name(key: &str) -> &str {
    let mut chars = key.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        key
    } else {
        "item"
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Two-dimensional payloads (a list of records) become header plus data
/// rows; one-dimensional payloads (e.g. an error body) become a
/// two-line sheet.
fn render_csv(data: &Value) -> Result<String, FormatError> {
    let rows: Vec<&serde_json::Map<String, Value>> = match data {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(object) => vec![object],
        _ => Vec::new(),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    if let Some(first) = rows.first() {
        let headers: Vec<&str> = first.keys().map(String::as_str).collect();
        writer
            .write_record(&headers)
            .map_err(|e| FormatError::render(e.to_string()))?;
        for row in &rows {
            let cells: Vec<String> = headers
                .iter()
                .map(|header| row.get(*header).map(scalar_string).unwrap_or_default())
                .collect();
            writer
                .write_record(&cells)
                .map_err(|e| FormatError::render(e.to_string()))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FormatError::render(e.to_string()))
}

// =============================================================================
// HTML
// =============================================================================

/// Minimal HTML rendering: a table for record payloads, an error page
/// for error payloads.
fn render_html(data: &Value) -> String {
    if let Some(error) = data.get("error").and_then(Value::as_str) {
        let code = data
            .get("responseCode")
            .or_else(|| data.get("code"))
            .and_then(Value::as_u64)
            .unwrap_or(500);
        return page(
            &format!("Error {code}"),
            &format!(
                "<p class=\"error\">{code}: {}</p>",
                html_escape(error)
            ),
        );
    }

    let body = match data {
        Value::Array(items) => {
            let rows: Vec<&serde_json::Map<String, Value>> =
                items.iter().filter_map(Value::as_object).collect();
            match rows.first() {
                Some(first) => {
                    let headers: Vec<&String> = first.keys().collect();
                    let mut table = String::from("<table><tr>");
                    for header in &headers {
                        table.push_str(&format!("<th>{}</th>", html_escape(header)));
                    }
                    table.push_str("</tr>");
                    for row in &rows {
                        table.push_str("<tr>");
                        for header in &headers {
                            let cell = row.get(*header).map(scalar_string).unwrap_or_default();
                            table.push_str(&format!("<td>{}</td>", html_escape(&cell)));
                        }
                        table.push_str("</tr>");
                    }
                    table.push_str("</table>");
                    table
                }
                None => String::from("<p>No records</p>"),
            }
        }
        Value::Object(object) => {
            let mut list = String::from("<dl>");
            for (key, value) in object {
                list.push_str(&format!(
                    "<dt>{}</dt><dd>{}</dd>",
                    html_escape(key),
                    html_escape(&scalar_string(value))
                ));
            }
            list.push_str("</dl>");
            list
        }
        other => format!("<pre>{}</pre>", html_escape(&scalar_string(other))),
    };
    page("restgate", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>{body}</body></html>\n",
        html_escape(title)
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// String form of a JSON value for flat outputs: scalars keep their
/// natural form, arrays join with semicolons, objects serialize.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .collect::<Vec<_>>()
            .join(";"),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
