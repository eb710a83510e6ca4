//! Path template compilation.
//!
//! # Responsibilities
//! - Compile `/users/{id}` style templates into an anchored regex
//! - Record placeholder names in left-to-right order
//! - Extract captured segments and re-expand templates
//!
//! # Design Decisions
//! - A placeholder captures exactly one path segment (`[^/]+`)
//! - Literal text is escaped, so `.` or `+` in a template match themselves
//! - Malformed templates are rejected at startup, never per request

use regex::Regex;
use thiserror::Error;

/// Errors raised while compiling a route.
#[derive(Debug, Error)]
pub enum RouteError {
    /// `{` without a matching `}` (or the reverse).
    #[error("unbalanced brace at byte {position} in pattern '{pattern}'")]
    UnbalancedBrace { pattern: String, position: usize },

    /// `{}` with nothing inside.
    #[error("empty placeholder at byte {position} in pattern '{pattern}'")]
    EmptyPlaceholder { pattern: String, position: usize },

    /// Placeholder names must be unique within one pattern.
    #[error("duplicate placeholder '{name}' in pattern '{pattern}'")]
    DuplicatePlaceholder { pattern: String, name: String },

    /// Placeholder contains characters outside `[A-Za-z0-9_.-]`.
    #[error("invalid placeholder '{name}' in pattern '{pattern}'")]
    InvalidPlaceholder { pattern: String, name: String },

    /// Patterns are absolute paths.
    #[error("pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    /// HTTP method outside GET/POST/PUT/DELETE/ANY.
    #[error("unsupported HTTP method '{0}'")]
    UnknownMethod(String),

    /// A configured route names a handler that was never registered.
    #[error("unknown handler '{handler}' for route '{pattern}'")]
    UnknownHandler { pattern: String, handler: String },

    #[error("regex compilation failed: {0}")]
    Regex(#[from] regex::Error),
}

/// Parameters captured from a path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a captured value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Iterate `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Captured values in pattern order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = PathParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

/// A piece of a template: literal text or a placeholder name.
enum Token<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

impl RoutePattern {
    /// Compile a template into a matcher.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        if !template.starts_with('/') {
            return Err(RouteError::NotAbsolute(template.to_string()));
        }

        let tokens = tokenize(template)?;
        let mut regex = String::with_capacity(template.len() + 8);
        let mut names: Vec<String> = Vec::new();
        regex.push('^');

        for token in tokens {
            match token {
                Token::Literal(text) => regex.push_str(&regex::escape(text)),
                Token::Placeholder(name) => {
                    if names.iter().any(|n| n == name) {
                        return Err(RouteError::DuplicatePlaceholder {
                            pattern: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    regex.push_str("([^/]+)");
                    names.push(name.to_string());
                }
            }
        }
        regex.push('$');

        Ok(Self {
            template: template.to_string(),
            regex: Regex::new(&regex)?,
            names,
        })
    }

    /// The original template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names in left-to-right order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// True when the template has no placeholders.
    pub fn is_literal(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Zip captured groups with placeholder names.
    /// Returns an empty set when the path does not match.
    pub fn extract(&self, path: &str) -> PathParams {
        let Some(caps) = self.regex.captures(path) else {
            return PathParams::new();
        };

        self.names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.clone(), m.as_str())))
            .collect()
    }

    /// Substitute values back into the template.
    /// Returns `None` if a placeholder has no value.
    pub fn expand(&self, params: &PathParams) -> Option<String> {
        let tokens = tokenize(&self.template).ok()?;
        let mut path = String::with_capacity(self.template.len());
        for token in tokens {
            match token {
                Token::Literal(text) => path.push_str(text),
                Token::Placeholder(name) => path.push_str(params.get(name)?),
            }
        }
        Some(path)
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, RouteError> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut open: Option<usize> = None;

    for (i, c) in template.char_indices() {
        match (c, open) {
            ('{', None) => {
                if literal_start < i {
                    tokens.push(Token::Literal(&template[literal_start..i]));
                }
                open = Some(i);
            }
            ('{', Some(_)) | ('}', None) => {
                return Err(RouteError::UnbalancedBrace {
                    pattern: template.to_string(),
                    position: i,
                });
            }
            ('}', Some(start)) => {
                let name = &template[start + 1..i];
                if name.is_empty() {
                    return Err(RouteError::EmptyPlaceholder {
                        pattern: template.to_string(),
                        position: start,
                    });
                }
                if !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
                {
                    return Err(RouteError::InvalidPlaceholder {
                        pattern: template.to_string(),
                        name: name.to_string(),
                    });
                }
                tokens.push(Token::Placeholder(name));
                open = None;
                literal_start = i + 1;
            }
            _ => {}
        }
    }

    if let Some(position) = open {
        return Err(RouteError::UnbalancedBrace {
            pattern: template.to_string(),
            position,
        });
    }
    if literal_start < template.len() {
        tokens.push(Token::Literal(&template[literal_start..]));
    }
    Ok(tokens)
}
