//! Glob patterns over relative paths.
//!
//! Patterns are anchored on the whole path and case-sensitive. `*` matches
//! any run of characters including `/`, `?` matches exactly one character,
//! `[...]` is a character class (`[!...]` or `[^...]` negates, `a-z` ranges).
//! Compilation goes through `regex`.

use crate::errors::{ChainError, Result};
use regex::Regex;
use std::fmt;

#[derive(Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    /// # Errors
    ///
    /// `InvalidPattern` for an unterminated `[` class.
    pub fn compile(pattern: &str) -> Result<Self> {
        let translated = translate(pattern)?;
        let regex = Regex::new(&translated).map_err(|e| ChainError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobPattern").field(&self.pattern).finish()
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

fn translate(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Runs of stars collapse into one.
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let (class, next) = translate_class(&chars, i, pattern)?;
                out.push_str(&class);
                i = next;
                continue;
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    Ok(out)
}

/// Translate the class starting at `chars[start] == '['`; returns the regex
/// fragment and the index just past the closing `]`.
fn translate_class(chars: &[char], start: usize, pattern: &str) -> Result<(String, usize)> {
    let mut i = start + 1;
    let mut class = String::from("[");

    if i < chars.len() && (chars[i] == '!' || chars[i] == '^') {
        class.push('^');
        i += 1;
    }

    let body_start = i;
    loop {
        if i >= chars.len() {
            return Err(ChainError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!("unterminated character class at offset {}", start),
            });
        }
        let c = chars[i];
        // A ']' directly after the opening bracket is a literal member.
        if c == ']' && i > body_start {
            break;
        }
        match c {
            '\\' | '[' | ']' | '&' | '~' | '^' => {
                class.push('\\');
                class.push(c);
            }
            _ => class.push(c),
        }
        i += 1;
    }

    class.push(']');
    Ok((class, i + 1))
}
