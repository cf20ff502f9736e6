//! # Quill Pattern-Syntax Transformations
//!
//! Natural-language statement shapes (`TAKE $count FROM $array`) and the canonical call each
//! one is rewritten into (`ARRAY_TAKE($array, $count)`).
//!
//! ## Core Principles
//!
//! - **Explicit registry**: a [`PatternRegistry`] is built before parsing and only borrowed
//!   while parsing. There is no global registry.
//! - **Validated at registration**: malformed pattern or transformation text, and any
//!   transformation variable missing from its pattern, fail in [`PatternRegistry::register`].
//! - **Syntactic only**: matching produces a function name and argument expressions. It never
//!   evaluates anything.

use ::std::collections::HashMap;
use ::std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::ast::Literal;
use crate::diagnostics::QuillError;
use crate::err_msg;
use crate::syntax::classifier::is_word;
use crate::syntax::token::{lookup_reserved, Delimiter, Keyword, LiteralKind, Token, TokenKind};

pub mod matcher;
pub mod std;

pub use matcher::{rewrite, Rewrite};

// ============================================================================
// SECTION 1: CORE DATA STRUCTURES
// ============================================================================

/// Registration index of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub usize);

/// The pattern and part position where a vocabulary word first occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternRef {
    pub pattern: PatternId,
    pub position: usize,
}

/// Coarse token type used only for pattern type constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoarseType {
    Int,
    Float,
    String,
    Array,
    Bool,
    Identifier,
    Unknown,
}

impl CoarseType {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_uppercase().as_str() {
            "INT" => Some(CoarseType::Int),
            "FLOAT" => Some(CoarseType::Float),
            "STRING" => Some(CoarseType::String),
            "ARRAY" => Some(CoarseType::Array),
            "BOOL" => Some(CoarseType::Bool),
            "IDENTIFIER" => Some(CoarseType::Identifier),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoarseType::Int => "INT",
            CoarseType::Float => "FLOAT",
            CoarseType::String => "STRING",
            CoarseType::Array => "ARRAY",
            CoarseType::Bool => "BOOL",
            CoarseType::Identifier => "IDENTIFIER",
            CoarseType::Unknown => "UNKNOWN",
        }
    }

    /// Infers the coarse type of a capture from its first token.
    pub fn of_token(token: &Token) -> Self {
        match token.kind {
            TokenKind::Literal(LiteralKind::Int) => CoarseType::Int,
            TokenKind::Literal(LiteralKind::Decimal) => CoarseType::Float,
            TokenKind::Literal(LiteralKind::String | LiteralKind::TemplateString) => {
                CoarseType::String
            }
            TokenKind::Literal(LiteralKind::Bool) => CoarseType::Bool,
            TokenKind::Keyword(Keyword::New) => CoarseType::Array,
            TokenKind::Delimiter(Delimiter::LBracket) => CoarseType::Array,
            TokenKind::Identifier | TokenKind::PatternKeyword(_) => CoarseType::Identifier,
            _ => CoarseType::Unknown,
        }
    }
}

impl fmt::Display for CoarseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternPart {
    /// A fixed word, stored uppercase.
    Literal { word: String, optional: bool },
    /// A `$name` placeholder.
    Variable {
        name: String,
        optional: bool,
        constraint: Option<CoarseType>,
    },
}

impl PatternPart {
    pub fn is_optional(&self) -> bool {
        match self {
            PatternPart::Literal { optional, .. } | PatternPart::Variable { optional, .. } => {
                *optional
            }
        }
    }

    pub fn literal_word(&self) -> Option<&str> {
        match self {
            PatternPart::Literal { word, .. } => Some(word),
            PatternPart::Variable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub parts: Vec<PatternPart>,
    pub source: String,
}

impl Pattern {
    /// The required literal every pattern starts with.
    pub fn leading_word(&self) -> &str {
        self.parts
            .first()
            .and_then(PatternPart::literal_word)
            .unwrap_or_default()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PatternPart::Variable { name: n, .. } if n == name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformArg {
    Literal(Literal),
    Variable {
        name: String,
        default: Option<Literal>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub function: String,
    pub args: Vec<TransformArg>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTransformation {
    pub id: PatternId,
    pub pattern: Pattern,
    pub transformation: Transformation,
}

/// The serialized form of a transformation: its two source texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub pattern: String,
    pub transform: String,
}

// ============================================================================
// SECTION 2: DEFINITION PARSING
// ============================================================================

static VARIABLE_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*)(?::([A-Za-z]+))?(\?)?$").unwrap()
});
static CALL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$").unwrap());
static ARG_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*)(?:\s*=\s*(.+))?$").unwrap()
});

/// Parses pattern text such as `SORT $array ORDER? $order?`.
pub fn parse_pattern(text: &str) -> Result<Pattern, QuillError> {
    let mut parts = Vec::new();
    for piece in text.split_whitespace() {
        let part = if piece.starts_with('$') {
            parse_variable_part(piece, text)?
        } else {
            parse_literal_part(piece, text)?
        };
        if let PatternPart::Variable { name, .. } = &part {
            if parts
                .iter()
                .any(|p| matches!(p, PatternPart::Variable { name: n, .. } if n == name))
            {
                return Err(err_msg!(
                    PatternConfiguration,
                    "variable ${} appears twice in pattern '{}'",
                    name,
                    text
                ));
            }
        }
        parts.push(part);
    }

    match parts.first() {
        Some(PatternPart::Literal { optional: false, .. }) => {}
        Some(_) => {
            return Err(err_msg!(
                PatternConfiguration,
                "pattern '{}' must start with a required keyword",
                text
            ))
        }
        None => return Err(err_msg!(PatternConfiguration, "empty pattern")),
    }

    Ok(Pattern {
        parts,
        source: text.trim().to_string(),
    })
}

fn parse_variable_part(piece: &str, text: &str) -> Result<PatternPart, QuillError> {
    let Some(caps) = VARIABLE_PART.captures(piece) else {
        return Err(err_msg!(
            PatternConfiguration,
            "malformed variable '{}' in pattern '{}'",
            piece,
            text
        ));
    };
    let constraint = match caps.get(2) {
        Some(ty) => Some(CoarseType::parse(ty.as_str()).ok_or_else(|| {
            err_msg!(
                PatternConfiguration,
                "unknown type constraint '{}' in pattern '{}'",
                ty.as_str(),
                text
            )
        })?),
        None => None,
    };
    Ok(PatternPart::Variable {
        name: caps[1].to_string(),
        optional: caps.get(3).is_some(),
        constraint,
    })
}

fn parse_literal_part(piece: &str, text: &str) -> Result<PatternPart, QuillError> {
    let (word, optional) = match piece.strip_suffix('?') {
        Some(word) => (word, true),
        None => (piece, false),
    };
    if !is_word(word) {
        return Err(err_msg!(
            PatternConfiguration,
            "pattern keyword '{}' in '{}' is not a word",
            word,
            text
        ));
    }
    let word = word.to_uppercase();
    if lookup_reserved(&word).is_some() {
        return Err(err_msg!(
            PatternConfiguration,
            "'{}' is a reserved word and cannot be used in pattern '{}'",
            word,
            text
        ));
    }
    Ok(PatternPart::Literal { word, optional })
}

/// Parses transformation text such as `ARRAY_SORT($array, $order="ASC")`.
pub fn parse_transformation(text: &str) -> Result<Transformation, QuillError> {
    let trimmed = text.trim();
    let Some(caps) = CALL_SHAPE.captures(trimmed) else {
        return Err(err_msg!(
            PatternConfiguration,
            "transformation '{}' is not of the form NAME(args)",
            text
        ));
    };
    let args = split_args(&caps[2])
        .into_iter()
        .map(|arg| parse_transform_arg(&arg, text))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Transformation {
        function: caps[1].to_string(),
        args,
        source: trimmed.to_string(),
    })
}

/// Splits on commas outside of quotes. Blank input yields no arguments.
fn split_args(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, ',') => args.push(::std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    args.push(current.trim().to_string());
    args
}

fn parse_transform_arg(arg: &str, text: &str) -> Result<TransformArg, QuillError> {
    if let Some(caps) = ARG_VARIABLE.captures(arg) {
        let default = match caps.get(2) {
            Some(lit) => Some(parse_literal(lit.as_str().trim()).ok_or_else(|| {
                err_msg!(
                    PatternConfiguration,
                    "default '{}' in transformation '{}' is not a literal",
                    lit.as_str(),
                    text
                )
            })?),
            None => None,
        };
        return Ok(TransformArg::Variable {
            name: caps[1].to_string(),
            default,
        });
    }
    parse_literal(arg).map(TransformArg::Literal).ok_or_else(|| {
        err_msg!(
            PatternConfiguration,
            "argument '{}' in transformation '{}' is neither a variable nor a literal",
            arg,
            text
        )
    })
}

fn parse_literal(text: &str) -> Option<Literal> {
    match text {
        "TRUE" => return Some(Literal::Bool(true)),
        "FALSE" => return Some(Literal::Bool(false)),
        "NULL" => return Some(Literal::Null),
        _ => {}
    }
    if let Ok(value) = text.parse::<i64>() {
        return Some(Literal::Int(value));
    }
    if text.contains('.') {
        if let Ok(value) = text.parse::<f64>() {
            return Some(Literal::Decimal(value));
        }
    }
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')));
    quoted.then(|| Literal::String(text[1..text.len() - 1].to_string()))
}

// ============================================================================
// SECTION 3: REGISTRY
// ============================================================================

/// Ordered collection of transformations plus the lookup tables the classifier and
/// matcher consult. Built before parsing; read-only while parsing.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    transformations: Vec<SyntaxTransformation>,
    /// Leading keyword to candidate ids, in registration order.
    by_leading: HashMap<String, Vec<PatternId>>,
    /// Every literal word to its first occurrence.
    vocabulary: HashMap<String, PatternRef>,
}

impl PatternRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses, validates and registers a transformation.
    ///
    /// # Errors
    /// `PatternConfiguration` when either text is malformed or the transformation refers to a
    /// variable the pattern does not declare.
    pub fn register(&mut self, pattern: &str, transform: &str) -> Result<PatternId, QuillError> {
        let pattern = parse_pattern(pattern)?;
        let transformation = parse_transformation(transform)?;

        for arg in &transformation.args {
            let TransformArg::Variable { name, .. } = arg else {
                continue;
            };
            if !pattern.has_variable(name) {
                return Err(err_msg!(
                    PatternConfiguration,
                    "transformation '{}' uses ${} which pattern '{}' does not declare",
                    transformation.source,
                    name,
                    pattern.source
                ));
            }
        }

        let id = PatternId(self.transformations.len());
        for (position, part) in pattern.parts.iter().enumerate() {
            if let Some(word) = part.literal_word() {
                self.vocabulary
                    .entry(word.to_string())
                    .or_insert(PatternRef {
                        pattern: id,
                        position,
                    });
            }
        }
        self.by_leading
            .entry(pattern.leading_word().to_string())
            .or_default()
            .push(id);

        debug!(id = id.0, pattern = %pattern.source, transform = %transformation.source, "registered pattern");
        self.transformations.push(SyntaxTransformation {
            id,
            pattern,
            transformation,
        });
        Ok(id)
    }

    pub fn get(&self, id: PatternId) -> Option<&SyntaxTransformation> {
        self.transformations.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyntaxTransformation> {
        self.transformations.iter()
    }

    /// Candidates led by `word` (uppercase), in registration order.
    pub fn candidates(&self, word: &str) -> &[PatternId] {
        self.by_leading.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_leading_keyword(&self, word: &str) -> bool {
        self.by_leading.contains_key(word)
    }

    /// First occurrence of `word` (uppercase) in any registered pattern.
    pub fn vocabulary_entry(&self, word: &str) -> Option<PatternRef> {
        self.vocabulary.get(word).copied()
    }

    pub fn definitions(&self) -> Vec<PatternDefinition> {
        self.transformations
            .iter()
            .map(|t| PatternDefinition {
                pattern: t.pattern.source.clone(),
                transform: t.transformation.source.clone(),
            })
            .collect()
    }

    /// Registers definitions in order, stopping at the first invalid one.
    pub fn extend_from<I>(&mut self, definitions: I) -> Result<(), QuillError>
    where
        I: IntoIterator<Item = PatternDefinition>,
    {
        for def in definitions {
            self.register(&def.pattern, &def.transform)?;
        }
        Ok(())
    }

    /// Loads a registry from a JSON document `{"patterns": [{"pattern", "transform"}, ...]}`.
    pub fn from_json(text: &str) -> Result<Self, QuillError> {
        let doc: RegistryDocument = serde_json::from_str(text).map_err(|e| {
            err_msg!(PatternConfiguration, "invalid pattern document").with_cause(e)
        })?;
        doc.into_registry()
    }

    /// Loads a registry from the YAML form of the same document.
    pub fn from_yaml(text: &str) -> Result<Self, QuillError> {
        let doc: RegistryDocument = serde_yaml::from_str(text).map_err(|e| {
            err_msg!(PatternConfiguration, "invalid pattern document").with_cause(e)
        })?;
        doc.into_registry()
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryDocument {
    patterns: Vec<PatternDefinition>,
}

impl RegistryDocument {
    fn into_registry(self) -> Result<PatternRegistry, QuillError> {
        let mut registry = PatternRegistry::new();
        registry.extend_from(self.patterns)?;
        Ok(registry)
    }
}

impl Serialize for PatternRegistry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PatternRegistry", 1)?;
        s.serialize_field("patterns", &self.definitions())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for PatternRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let doc = RegistryDocument::deserialize(deserializer)?;
        doc.into_registry().map_err(serde::de::Error::custom)
    }
}
