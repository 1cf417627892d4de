//! Command templates for custom optimize scripts.
//!
//! A template is split into words (honouring single and double quotes), then
//! `${name}` placeholders inside each word are replaced from a fixed set of
//! variables. Nothing is evaluated and no shell is involved, so a substituted
//! path containing spaces stays one argument.

use std::collections::BTreeMap;

use thiserror::Error;

/// Variables a template may reference.
pub const TEMPLATE_VARS: &[&str] = &["contract", "src", "pwd", "root", "arch_suffix"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown variable ${{{name}}} in command `{template}` (available: {})", TEMPLATE_VARS.join(", "))]
    UnknownVariable { name: String, template: String },

    #[error("Unterminated placeholder in command `{template}`")]
    UnterminatedPlaceholder { template: String },

    #[error("Unbalanced quote in command `{template}`")]
    UnbalancedQuote { template: String },

    #[error("Command template is empty")]
    Empty,
}

/// Values for the allow-listed variables.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable. Names outside the allow-list are ignored.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Some(known) = TEMPLATE_VARS.iter().find(|known| **known == name) {
            self.values.insert(*known, value.into());
        }
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Split `template` into argv words and substitute variables in each.
pub fn substitute(template: &str, vars: &TemplateVars) -> Result<Vec<String>, TemplateError> {
    let words = split_words(template)?;
    if words.is_empty() {
        return Err(TemplateError::Empty);
    }

    words
        .iter()
        .map(|word| expand_word(word, template, vars))
        .collect()
}

/// Shell-like word splitting: whitespace separates words, quotes group,
/// and a backslash-newline continues the line.
fn split_words(template: &str) -> Result<Vec<String>, TemplateError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') if matches!(chars.peek(), Some('\n' | '\r')) => {
                while matches!(chars.peek(), Some('\n' | '\r')) {
                    chars.next();
                }
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(TemplateError::UnbalancedQuote {
            template: template.to_string(),
        });
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn expand_word(word: &str, template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    // `$(pwd)` is how optimize scripts written for a shell name the working directory
    let word = word.replace("$(pwd)", "${pwd}");

    let mut out = String::with_capacity(word.len());
    let mut rest = word.as_str();

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| TemplateError::UnterminatedPlaceholder {
                template: template.to_string(),
            })?;

        let name = after[..end].trim();
        let value = vars.get(name).ok_or_else(|| TemplateError::UnknownVariable {
            name: name.to_string(),
            template: template.to_string(),
        })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
