//! Report filename handling: `Content-Disposition` parsing and the dated
//! default name.

use std::sync::LazyLock;

use chrono::NaiveDate;
use handlebars::Handlebars;
use regex::Regex;
use serde_json::json;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "VSME_Report_{{date}}.xlsx";

static ENCODED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)filename\*\s*=\s*UTF-8'[^']*'([^;]+)").expect("valid encoded filename regex")
});
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\s*=\s*"([^"]*)""#).expect("valid quoted filename regex")
});
static BARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)filename\s*=\s*([^;\s]+)").expect("valid bare filename regex")
});

/// Extract the suggested filename from a `Content-Disposition` value.
///
/// The UTF-8 `filename*` form wins over the quoted ASCII form, which wins over
/// a bare token. Directory components are dropped.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let encoded = ENCODED_RE
        .captures(header)
        .and_then(|captures| {
            urlencoding::decode(captures[1].trim())
                .ok()
                .map(|decoded| decoded.into_owned())
        })
        .and_then(|decoded| sanitize(&decoded));
    if encoded.is_some() {
        return encoded;
    }
    if let Some(captures) = QUOTED_RE.captures(header) {
        return sanitize(&captures[1]);
    }
    BARE_RE
        .captures(header)
        .and_then(|captures| sanitize(&captures[1]))
}

/// Render the fallback filename for a report generated on `date`.
pub fn default_filename(template: &str, date: NaiveDate) -> Result<String, handlebars::RenderError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.render_template(
        template,
        &json!({ "date": date.format("%Y-%m-%d").to_string() }),
    )
}

fn sanitize(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
