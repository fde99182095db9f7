//! Command parser: raw chat text to a typed [`Command`].
//!
//! Parsing is pure: it checks verbs, arity and token syntax only. Whether a
//! referenced node exists is decided later by the graph.

pub mod lexer;
pub mod verbs;

pub use lexer::{tokenize, Token};
pub use verbs::{help_text, suggest, Verb};

use crate::types::{
    validate_attribute_key, validate_identifier, validate_text, AttrTarget, Attributes, Command,
    Direction, EdgeOptions, Edit, OutputFormat, ParseError,
};

/// Parse one command line.
pub fn parse(raw: &str) -> Result<Command, ParseError> {
    let tokens = tokenize(raw)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Err(ParseError::new("empty command; try 'help'", raw, 0));
    };

    let word = head.text.strip_prefix('/').unwrap_or(&head.text);
    if word.is_empty() {
        return Err(ParseError::new("empty command; try 'help'", raw, head.column));
    }
    let verb = match (head.is_quoted(), Verb::from_name(word)) {
        (false, Some(verb)) => verb,
        _ => {
            let reason = match suggest(word) {
                Some(s) => format!("unknown command '{word}'; did you mean '{s}'?"),
                None => format!("unknown command '{word}'; try 'help'"),
            };
            return Err(ParseError::new(reason, raw, head.column));
        }
    };

    let args = Args {
        raw,
        verb,
        tokens: rest,
    };
    args.into_command()
}

/// Arguments following the verb.
struct Args<'a> {
    raw: &'a str,
    verb: Verb,
    tokens: &'a [Token],
}

/// Positionals, `key=value` attributes and `--flags` of an add command.
struct Split<'a> {
    positional: Vec<&'a Token>,
    attributes: Attributes,
    flags: Vec<&'a Token>,
}

impl<'a> Args<'a> {
    fn into_command(self) -> Result<Command, ParseError> {
        match self.verb {
            Verb::AddNode => self.add_node(),
            Verb::AddEdge => self.add_edge(),
            Verb::RemoveNode => {
                self.arity(1, 1)?;
                Ok(Edit::RemoveNode {
                    id: self.identifier(&self.tokens[0])?,
                }
                .into())
            }
            Verb::RemoveEdge => {
                self.arity(2, 3)?;
                Ok(Edit::RemoveEdge {
                    source: self.identifier(&self.tokens[0])?,
                    target: self.identifier(&self.tokens[1])?,
                    label: self.tokens.get(2).map(|t| t.text.clone()),
                }
                .into())
            }
            Verb::SetAttribute => self.set_attribute(),
            Verb::Render => {
                self.arity(0, 1)?;
                let format = match self.tokens.first() {
                    Some(token) => Some(OutputFormat::from_name(&token.text).ok_or_else(|| {
                        self.error(
                            format!("unknown format '{}'; use png, svg or pdf", token.text),
                            token.column,
                        )
                    })?),
                    None => None,
                };
                Ok(Command::Render { format })
            }
            Verb::Reset => self.arity(0, 0).map(|_| Command::Reset),
            Verb::Undo => self.arity(0, 0).map(|_| Command::Undo),
            Verb::Help => Ok(Command::Help),
        }
    }

    fn add_node(&self) -> Result<Command, ParseError> {
        let split = self.split()?;
        if let Some(flag) = split.flags.first() {
            return Err(self.error(format!("unknown flag '{}'", flag.text), flag.column));
        }
        self.positional_arity(&split.positional, 1, 2)?;
        let label = split.positional.get(1).map(|t| t.text.clone());
        if let (Some(label), Some(token)) = (&label, split.positional.get(1)) {
            self.text("label", label, token)?;
        }
        Ok(Edit::AddNode {
            id: self.identifier(split.positional[0])?,
            label,
            attributes: split.attributes,
        }
        .into())
    }

    fn add_edge(&self) -> Result<Command, ParseError> {
        let split = self.split()?;
        let mut options = EdgeOptions::default();
        for token in &split.flags {
            match token.flag() {
                Some("undirected") => options.direction = Direction::Undirected,
                Some("directed") => options.direction = Direction::Directed,
                Some("unique") => options.unique = true,
                _ => {
                    return Err(self.error(format!("unknown flag '{}'", token.text), token.column))
                }
            }
        }
        self.positional_arity(&split.positional, 2, 3)?;
        let label = split.positional.get(2).map(|t| t.text.clone());
        if let (Some(label), Some(token)) = (&label, split.positional.get(2)) {
            self.text("label", label, token)?;
        }
        Ok(Edit::AddEdge {
            source: self.identifier(split.positional[0])?,
            target: self.identifier(split.positional[1])?,
            label,
            attributes: split.attributes,
            options,
        }
        .into())
    }

    fn set_attribute(&self) -> Result<Command, ParseError> {
        let Some(kind) = self.tokens.first() else {
            return Err(self.usage_error(self.end()));
        };
        let (target, rest) = match kind.text.to_lowercase().as_str() {
            "graph" => {
                self.arity(3, 3)?;
                (AttrTarget::Graph, &self.tokens[1..])
            }
            "node" => {
                self.arity(4, 4)?;
                let id = self.identifier(&self.tokens[1])?;
                (AttrTarget::Node { id }, &self.tokens[2..])
            }
            "edge" => {
                self.arity(5, 5)?;
                let source = self.identifier(&self.tokens[1])?;
                let target = self.identifier(&self.tokens[2])?;
                (AttrTarget::Edge { source, target }, &self.tokens[3..])
            }
            other => {
                return Err(self.error(
                    format!("unknown target kind '{other}'; use graph, node or edge"),
                    kind.column,
                ))
            }
        };

        let (key, value) = (&rest[0], &rest[1]);
        validate_attribute_key(&key.text).map_err(|e| self.error(e.to_string(), key.column))?;
        self.text(&key.text, &value.text, value)?;
        Ok(Edit::SetAttribute {
            target,
            key: key.text.clone(),
            value: value.text.clone(),
        }
        .into())
    }

    /// Separate positionals from attributes and flags.
    fn split(&self) -> Result<Split<'a>, ParseError> {
        let mut split = Split {
            positional: Vec::new(),
            attributes: Attributes::new(),
            flags: Vec::new(),
        };
        for token in self.tokens {
            if token.flag().is_some() {
                split.flags.push(token);
            } else if let Some((key, value)) = token.key_value() {
                validate_attribute_key(key).map_err(|e| self.error(e.to_string(), token.column))?;
                self.text(key, value, token)?;
                split.attributes.insert(key.to_string(), value.to_string());
            } else {
                split.positional.push(token);
            }
        }
        Ok(split)
    }

    fn identifier(&self, token: &Token) -> Result<String, ParseError> {
        validate_identifier(&token.text).map_err(|e| self.error(e.to_string(), token.column))?;
        Ok(token.text.clone())
    }

    fn text(&self, key: &str, value: &str, token: &Token) -> Result<(), ParseError> {
        validate_text(key, value).map_err(|e| self.error(e.to_string(), token.column))
    }

    fn arity(&self, min: usize, max: usize) -> Result<(), ParseError> {
        let refs: Vec<&Token> = self.tokens.iter().collect();
        self.positional_arity(&refs, min, max)
    }

    fn positional_arity(&self, tokens: &[&Token], min: usize, max: usize) -> Result<(), ParseError> {
        if tokens.len() < min {
            return Err(self.usage_error(self.end()));
        }
        if let Some(extra) = tokens.get(max) {
            return Err(self.usage_error(extra.column));
        }
        Ok(())
    }

    fn end(&self) -> usize {
        self.raw.chars().count()
    }

    fn usage_error(&self, column: usize) -> ParseError {
        self.error(format!("usage: {}", self.verb.usage()), column)
    }

    fn error(&self, reason: impl Into<String>, column: usize) -> ParseError {
        ParseError::new(reason, self.raw, column)
    }
}
