//! Cucumber expressions.
//!
//! An expression such as `I type {string} to input at index {int}` compiles
//! to an anchored regex. Literal text matches verbatim (regex metacharacters
//! are escaped), `(s)` marks optional text, `\{` escapes a brace, and each
//! `{type}` becomes one capture that is converted to a [`StepArg`]. A bare
//! `}` is literal text; only an unterminated `{` is an error.

use super::args::{StepArg, StepArgs};
use crate::result::{StepwrightError, StepwrightResult};
use regex::Regex;
use std::fmt;

/// Parameter types understood inside `{}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// `{string}`: double- or single-quoted text
    String,
    /// `{int}`
    Int,
    /// `{float}`
    Float,
    /// `{word}`: text without whitespace
    Word,
    /// `{}`: anything
    Anonymous,
    /// `{listOfString}`: `[a, b, c]`, items trimmed
    ListOfString,
}

impl ParameterType {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "int" => Self::Int,
            "float" => Self::Float,
            "word" => Self::Word,
            "" => Self::Anonymous,
            "listOfString" => Self::ListOfString,
            _ => return None,
        })
    }

    const fn pattern(self) -> &'static str {
        match self {
            Self::String => r#"(?:"([^"]*)"|'([^']*)')"#,
            Self::Int => r"(-?\d+)",
            Self::Float => r"(-?(?:\d+\.?\d*|\.\d+))",
            Self::Word => r"(\S+)",
            Self::Anonymous => r"(.*)",
            Self::ListOfString => r"\[([^\]]*)\]",
        }
    }

    const fn groups(self) -> usize {
        match self {
            Self::String => 2,
            _ => 1,
        }
    }
}

/// A compiled step expression
#[derive(Debug, Clone)]
pub struct StepExpression {
    source: String,
    regex: Regex,
    parameters: Vec<ParameterType>,
}

impl PartialEq for StepExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for StepExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl StepExpression {
    /// Compile `source`
    pub fn parse(source: &str) -> StepwrightResult<Self> {
        let invalid = |message: String| StepwrightError::InvalidExpression {
            expression: source.to_string(),
            message,
        };

        let mut pattern = String::from("^");
        let mut parameters = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => literal.push(escaped),
                    None => return Err(invalid("trailing backslash".to_string())),
                },
                '{' => {
                    pattern.push_str(&regex::escape(&std::mem::take(&mut literal)));
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(invalid("unterminated parameter".to_string()));
                            }
                            Some(ch) => name.push(ch),
                        }
                    }
                    let parameter = ParameterType::from_name(name.trim())
                        .ok_or_else(|| invalid(format!("unknown parameter type {{{name}}}")))?;
                    pattern.push_str(parameter.pattern());
                    parameters.push(parameter);
                }
                '(' => {
                    pattern.push_str(&regex::escape(&std::mem::take(&mut literal)));
                    let mut optional = String::new();
                    loop {
                        match chars.next() {
                            Some(')') => break,
                            Some('(' | '{') | None => {
                                return Err(invalid("unterminated optional text".to_string()));
                            }
                            Some(ch) => optional.push(ch),
                        }
                    }
                    pattern.push_str(&format!("(?:{})?", regex::escape(&optional)));
                }
                _ => literal.push(c),
            }
        }
        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            regex,
            parameters,
        })
    }

    /// Source text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declared parameter types, in order
    #[must_use]
    pub fn parameters(&self) -> &[ParameterType] {
        &self.parameters
    }

    /// Whether `text` matches, without converting arguments
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Match `text` and convert captures. `Ok(None)` when it does not match.
    pub fn match_text(&self, text: &str) -> StepwrightResult<Option<StepArgs>> {
        let Some(captures) = self.regex.captures(text) else {
            return Ok(None);
        };
        let mut args = Vec::with_capacity(self.parameters.len());
        let mut group = 1;
        for (index, parameter) in self.parameters.iter().enumerate() {
            let raw = (group..group + parameter.groups())
                .find_map(|g| captures.get(g))
                .map_or("", |m| m.as_str());
            group += parameter.groups();
            args.push(convert(*parameter, raw, index)?);
        }
        Ok(Some(StepArgs::new(args)))
    }
}

fn convert(parameter: ParameterType, raw: &str, index: usize) -> StepwrightResult<StepArg> {
    let bad = |e: &dyn fmt::Display| StepwrightError::StepArgument {
        index,
        message: format!("{raw:?}: {e}"),
    };
    Ok(match parameter {
        ParameterType::String | ParameterType::Word | ParameterType::Anonymous => StepArg::Str(raw.to_string()),
        ParameterType::Int => StepArg::Int(raw.parse().map_err(|e| bad(&e))?),
        ParameterType::Float => StepArg::Float(raw.parse().map_err(|e| bad(&e))?),
        ParameterType::ListOfString => StepArg::List(if raw.trim().is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(|item| item.trim().to_string()).collect()
        }),
    })
}
