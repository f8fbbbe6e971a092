//! Diagnostics for response bodies that are not JSON objects.
//!
//! The API sits behind an Apache Tomcat server which, on failure, answers with
//! an HTML error report instead of JSON. [`FormatErrorInfo::from_text`]
//! recognizes those pages and pulls out the message, description and body
//! text; anything else is reported as-is.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ERROR_REPORT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<title>Apache Tomcat.* - Error report</title>").expect("valid title regex")
});

static REPORT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<p><b>(message|description)</b> *<u>(.*?)</u></p>").expect("valid field regex")
});

static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<body[^>]*>(.*?)</body>").expect("valid body regex"));

const MESSAGE_PREFIX: &str =
    "Unexpected response format. Expected response to be a JSON object, but was instead:";

/// What could be recovered from a response body that was not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatErrorInfo {
    /// Human readable summary embedding the offending payload.
    pub message: String,
    /// The `message` field of an HTML error report, if present.
    pub server_message: Option<String>,
    /// The `description` field of an HTML error report, if present.
    pub description: Option<String>,
    /// The `<body>` text of an HTML error report, or the raw body otherwise.
    pub raw_body: String,
}

/// Fields scraped from an application server error page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorReport {
    /// First `message` field.
    pub message: Option<String>,
    /// First `description` field.
    pub description: Option<String>,
    /// Inner text of `<body>`.
    pub body: Option<String>,
}

impl FormatErrorInfo {
    /// Builds diagnostics from the raw response text.
    ///
    /// `parsed` is the body as decoded JSON, when it decoded at all. It is
    /// only used to render non-HTML payloads.
    ///
    /// # Examples
    ///
    /// ```
    /// use citygrid::FormatErrorInfo;
    ///
    /// let html = "<html><head><title>Apache Tomcat/9.0 - Error report</title></head>\
    ///             <body><p><b>message</b><u>Not Found</u></p></body></html>";
    ///
    /// let info = FormatErrorInfo::from_text(html, None);
    /// assert_eq!(info.server_message.as_deref(), Some("Not Found"));
    /// ```
    pub fn from_text(text: &str, parsed: Option<&Value>) -> Self {
        if let Some(report) = parse_error_report(text) {
            let raw_body = report.body.unwrap_or_else(|| text.to_string());
            return Self {
                message: format!("{MESSAGE_PREFIX}\n{raw_body}\n"),
                server_message: report.message,
                description: report.description,
                raw_body,
            };
        }

        let shown = match parsed {
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => text.to_string(),
        };

        Self {
            message: format!("{MESSAGE_PREFIX}\n{shown}\n"),
            server_message: None,
            description: None,
            raw_body: text.to_string(),
        }
    }
}

/// Scrapes an Apache Tomcat error report.
///
/// Returns `None` when the title does not identify an error report. Each
/// field is the first occurrence found; missing fields stay `None`.
pub fn parse_error_report(text: &str) -> Option<ErrorReport> {
    if !ERROR_REPORT_TITLE.is_match(text) {
        return None;
    }

    let mut report = ErrorReport::default();
    for caps in REPORT_FIELD.captures_iter(text) {
        let value = caps[2].to_string();
        match &caps[1] {
            "message" if report.message.is_none() => report.message = Some(value),
            "description" if report.description.is_none() => report.description = Some(value),
            _ => {}
        }
    }
    report.body = BODY.captures(text).map(|caps| caps[1].to_string());

    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOMCAT_PAGE: &str = "<html><head><title>Apache Tomcat/6.0.29 - Error report</title></head>\
<body>\n<h1>HTTP Status 500 - </h1>\n\
<p><b>type</b> <u>Exception report</u></p>\n\
<p><b>message</b> <u>Backend unavailable</u></p>\n\
<p><b>description</b> <u>The server encountered an internal error.</u></p>\n\
<p><b>message</b> <u>ignored second message</u></p>\n\
</body></html>";

    #[test]
    fn test_tomcat_report_fields() {
        let report = parse_error_report(TOMCAT_PAGE).unwrap();

        assert_eq!(report.message.as_deref(), Some("Backend unavailable"));
        assert_eq!(
            report.description.as_deref(),
            Some("The server encountered an internal error.")
        );
        let body = report.body.unwrap();
        assert!(body.starts_with("\n<h1>HTTP Status 500"));
        assert!(!body.contains("<body>"));
    }

    #[test]
    fn test_not_found_without_space() {
        let html = "<title>Apache Tomcat/9.0 - Error report</title>\
                    <body><p><b>message</b><u>Not Found</u></p></body>";
        let info = FormatErrorInfo::from_text(html, None);

        assert_eq!(info.server_message.as_deref(), Some("Not Found"));
        assert!(info.description.is_none());
        assert_eq!(info.raw_body, "<p><b>message</b><u>Not Found</u></p>");
        assert!(info.message.ends_with("<p><b>message</b><u>Not Found</u></p>\n"));
    }

    #[test]
    fn test_body_with_attributes() {
        let html = "<html><head><title>Apache Tomcat/5.5 - Error report</title></head>\
                    <body bgcolor=\"white\"><p><b>message</b> <u>Gone</u></p></body></html>";
        let info = FormatErrorInfo::from_text(html, None);

        assert_eq!(info.raw_body, "<p><b>message</b> <u>Gone</u></p>");
        assert_eq!(info.server_message.as_deref(), Some("Gone"));
    }

    #[test]
    fn test_report_without_body_keeps_whole_text() {
        let html = "<title>Apache Tomcat/7.0 - Error report</title>";
        let info = FormatErrorInfo::from_text(html, None);

        assert_eq!(info.raw_body, html);
        assert!(info.server_message.is_none());
    }

    #[test]
    fn test_other_html_is_not_a_report() {
        let html = "<html><title>Welcome</title><body>hi</body></html>";
        assert!(parse_error_report(html).is_none());

        let info = FormatErrorInfo::from_text(html, None);
        assert!(info.server_message.is_none());
        assert_eq!(info.raw_body, html);
        assert!(info.message.contains("<title>Welcome</title>"));
    }

    #[test]
    fn test_non_object_json_uses_parsed_text() {
        let parsed = serde_json::json!([1, 2, 3]);
        let info = FormatErrorInfo::from_text("[1, 2, 3]", Some(&parsed));

        assert!(info.message.contains("[1,2,3]"));
        assert_eq!(info.raw_body, "[1, 2, 3]");

        let parsed = Value::String("quoted".to_string());
        let info = FormatErrorInfo::from_text("\"quoted\"", Some(&parsed));
        assert!(info.message.ends_with(":\nquoted\n"));
    }
}
