//! Input shape validation, injection pattern detection and sanitization.
//!
//! Detection is advisory: callers decide whether to reject or only log a
//! value that matches an SQL or XSS pattern.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok()
});

static USERNAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").ok());

// E.164
static PHONE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").ok());

static URL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:[-\w.])+(?::\d+)?(?:/(?:[\w/_.\-])*(?:\?(?:[\w&=%.\-])*)?(?:#(?:\w*))?)?$",
    )
    .ok()
});

static SQL_INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|EXECUTE)\b",
        r"(?i)\b(OR|AND)\s+\d+\s*=\s*\d+",
        r"(?i)\bUNION\s+SELECT\b",
        r"--\s",
        r"/\*.*\*/",
        r"(?i);\s*DROP\s",
    ])
});

static XSS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?is)<script[^>]*>.*?</script>",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?i)<iframe[^>]*>",
        r"(?i)<object[^>]*>",
        r"(?i)<embed[^>]*>",
    ])
});

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    Option::as_ref(pattern).is_some_and(|pattern| pattern.is_match(value))
}

/// Returns whether the value is a well-formed email address once trimmed and
/// lowercased.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    let canonical = value.trim().to_lowercase();
    !canonical.is_empty() && matches(&EMAIL_PATTERN, &canonical)
}

/// Returns whether the value is 3-30 ASCII letters, digits or underscores.
#[must_use]
pub fn is_valid_username(value: &str) -> bool {
    matches(&USERNAME_PATTERN, value.trim())
}

/// Returns whether the value is an E.164 phone number.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    matches(&PHONE_PATTERN, value.trim())
}

/// Returns whether the value is an absolute http(s) URL.
#[must_use]
pub fn is_valid_url(value: &str) -> bool {
    matches(&URL_PATTERN, value.trim())
}

/// Returns whether the character count lies within `min..=max`.
#[must_use]
pub fn validate_length(value: &str, min_length: usize, max_length: Option<usize>) -> bool {
    let length = value.chars().count();
    length >= min_length && max_length.is_none_or(|max| length <= max)
}

/// Category of a suspicious input pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputThreat {
    /// Matches an SQL injection pattern.
    SqlInjection,
    /// Matches a cross-site scripting pattern.
    Xss,
}

impl InputThreat {
    /// Returns a short label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "SQL",
            Self::Xss => "XSS",
        }
    }
}

/// Returns whether the value matches any SQL injection pattern.
#[must_use]
pub fn detect_sql_injection(value: &str) -> bool {
    !value.is_empty()
        && SQL_INJECTION_PATTERNS
            .iter()
            .any(|pattern| pattern.is_match(value))
}

/// Returns whether the value matches any XSS pattern.
#[must_use]
pub fn detect_xss(value: &str) -> bool {
    !value.is_empty() && XSS_PATTERNS.iter().any(|pattern| pattern.is_match(value))
}

/// Returns every threat category the value matches.
#[must_use]
pub fn detect_threats(value: &str) -> Vec<InputThreat> {
    let mut threats = Vec::new();
    if detect_sql_injection(value) {
        threats.push(InputThreat::SqlInjection);
    }
    if detect_xss(value) {
        threats.push(InputThreat::Xss);
    }
    threats
}

/// Declared type of an input field; selects sanitization and shape checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// Free text; trimmed only.
    #[default]
    Text,
    /// Text rendered into HTML; entities are escaped.
    Html,
    /// Email address; lowercased and shape-checked.
    Email,
    /// Absolute http(s) URL.
    Url,
    /// Account handle.
    Username,
    /// E.164 phone number.
    Phone,
}

/// Sanitizes a value for its declared kind: trims, escapes HTML for
/// [`InputKind::Html`], lowercases emails and strips null bytes.
#[must_use]
pub fn sanitize_input(value: &str, kind: InputKind) -> String {
    let trimmed = value.trim();
    let sanitized = match kind {
        InputKind::Html => escape_html(trimmed),
        InputKind::Email => trimmed.to_lowercase(),
        InputKind::Text | InputKind::Url | InputKind::Username | InputKind::Phone => {
            trimmed.to_owned()
        }
    };

    sanitized.replace('\0', "")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Validation rule for one field of a request payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRule {
    /// Declared input kind.
    pub kind: InputKind,
    /// Whether the field must be present and non-empty.
    pub required: bool,
    /// Minimum character count.
    pub min_length: usize,
    /// Maximum character count, if bounded.
    pub max_length: Option<usize>,
}

impl FieldRule {
    /// Creates an optional rule of the given kind with no length bounds.
    #[must_use]
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the character count bounds.
    #[must_use]
    pub fn length(mut self, min_length: usize, max_length: Option<usize>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }
}

/// Outcome of [`validate_and_sanitize`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Sanitized value per schema field; `None` when absent or invalid.
    pub sanitized: BTreeMap<String, Option<String>>,
    /// Human-readable errors in schema order.
    pub errors: Vec<String>,
    /// Fields whose sanitized value matched a threat pattern.
    pub threats: Vec<(String, InputThreat)>,
}

impl ValidationReport {
    /// Returns whether no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the sanitized value of a field, if present and valid.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&str> {
        self.sanitized.get(field).and_then(Option::as_deref)
    }
}

/// Validates and sanitizes a JSON object against a schema of field rules.
#[must_use]
pub fn validate_and_sanitize(data: &Map<String, Value>, schema: &[(&str, FieldRule)]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (field, rule) in schema {
        let field = (*field).to_owned();
        let raw = data.get(&field).and_then(value_as_text);

        let Some(raw) = raw.filter(|value| !value.is_empty()) else {
            if rule.required {
                report.errors.push(format!("{field} is required"));
            }
            report.sanitized.insert(field, None);
            continue;
        };

        let sanitized = sanitize_input(&raw, rule.kind);
        for threat in detect_threats(&sanitized) {
            report.threats.push((field.clone(), threat));
        }

        let shape_error = match rule.kind {
            InputKind::Email if !is_valid_email(&sanitized) => {
                Some(format!("{field} must be a valid email address"))
            }
            InputKind::Username if !is_valid_username(&sanitized) => Some(format!(
                "{field} must be 3-30 characters, alphanumeric with underscores only"
            )),
            InputKind::Phone if !is_valid_phone(&sanitized) => {
                Some(format!("{field} must be a valid phone number"))
            }
            InputKind::Url if !is_valid_url(&sanitized) => {
                Some(format!("{field} must be a valid URL"))
            }
            _ => None,
        };

        let error = shape_error.or_else(|| {
            (!validate_length(&sanitized, rule.min_length, rule.max_length)).then(|| {
                let max = rule
                    .max_length
                    .map_or_else(|| "unlimited".to_owned(), |max| max.to_string());
                format!(
                    "{field} length must be between {} and {max}",
                    rule.min_length
                )
            })
        });

        match error {
            Some(error) => {
                report.errors.push(error);
                report.sanitized.insert(field, None);
            }
            None => {
                report.sanitized.insert(field, Some(sanitized));
            }
        }
    }

    report
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
