//! Single-pass pattern matcher and rewriter.
//!
//! Candidates sharing the leading keyword are tried in registration order. Within a
//! candidate the cursor only moves forward; a failed candidate leaves the caller's cursor
//! untouched. Each variable captures tokens up to the next literal of the pattern or, when
//! that literal does not show up, up to a capture boundary (see [`capture_end`]).

use tracing::{debug, trace};

use crate::ast::{Expr, Literal};
use crate::diagnostics::QuillError;
use crate::err_ctx;
use crate::parser::expr::parse_span;
use crate::patterns::{
    CoarseType, PatternId, PatternPart, PatternRegistry, SyntaxTransformation, TransformArg,
};
use crate::syntax::token::{Delimiter, Keyword, Operator, Token, TokenKind};
use crate::syntax::TokenStream;

/// A successful rewrite: the call the pattern statement stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub pattern: PatternId,
    pub function: String,
    pub args: Vec<Expr>,
    /// Index just past the last consumed token.
    pub next: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    LiteralMismatch,
    EmptyCapture,
    TypeMismatch,
}

#[derive(Debug, Clone)]
struct Failure {
    kind: FailureKind,
    at: usize,
    detail: String,
}

/// Bound token ranges, `None` for an unbound optional variable.
type Bindings = Vec<(String, Option<(usize, usize)>)>;

/// Rewrites the pattern statement whose leading keyword sits at `start`.
///
/// # Errors
/// `PatternConfiguration` when the furthest-reaching candidate failed on a required variable
/// that captured nothing, `Internal` when every candidate failed for another reason. Errors
/// from parsing a captured span are returned as they are.
pub fn rewrite(
    stream: &TokenStream,
    start: usize,
    registry: &PatternRegistry,
) -> Result<Rewrite, QuillError> {
    let end = stream.len();
    let Some(lead) = stream.get(start) else {
        return Err(err_ctx!(
            Internal,
            "pattern rewrite started past the end of input",
            stream.end_span()
        ));
    };

    let candidates = registry.candidates(&lead.raw.normalized);
    let mut furthest: Option<Failure> = None;
    let mut tried = Vec::with_capacity(candidates.len());

    for id in candidates {
        let Some(candidate) = registry.get(*id) else {
            continue;
        };
        tried.push(candidate.pattern.source.clone());
        match match_candidate(stream, start, end, candidate) {
            Ok((bindings, next)) => {
                let args = substitute(stream, candidate, &bindings)?;
                debug!(
                    pattern = %candidate.pattern.source,
                    function = %candidate.transformation.function,
                    consumed = next - start,
                    "rewrote pattern statement"
                );
                return Ok(Rewrite {
                    pattern: *id,
                    function: candidate.transformation.function.clone(),
                    args,
                    next,
                });
            }
            Err(failure) => {
                trace!(pattern = %candidate.pattern.source, kind = ?failure.kind, at = failure.at, "candidate rejected");
                if furthest.as_ref().map_or(true, |f| failure.at > f.at) {
                    furthest = Some(failure);
                }
            }
        }
    }

    match furthest {
        Some(failure) if failure.kind == FailureKind::EmptyCapture => Err(err_ctx!(
            PatternConfiguration,
            failure.detail,
            stream.span_at(failure.at),
            "supply a value for the placeholder, or mark it optional with '?'"
        )),
        Some(failure) => Err(err_ctx!(
            Internal,
            format!(
                "no pattern led by '{}' matched ({}); tried: {}",
                lead.text(),
                failure.detail,
                tried.join(" | ")
            ),
            lead.span()
        )),
        None => Err(err_ctx!(
            Internal,
            format!("'{}' was classified as a pattern keyword but leads no pattern", lead.text()),
            lead.span()
        )),
    }
}

fn match_candidate(
    stream: &TokenStream,
    start: usize,
    end: usize,
    candidate: &SyntaxTransformation,
) -> Result<(Bindings, usize), Failure> {
    let parts = &candidate.pattern.parts;
    let mut cursor = start;
    let mut bindings = Bindings::new();

    for (position, part) in parts.iter().enumerate() {
        match part {
            PatternPart::Literal { word, optional } => {
                let found = cursor < end && is_stop_word(stream, cursor, word);
                if found {
                    cursor += 1;
                } else if !optional {
                    return Err(Failure {
                        kind: FailureKind::LiteralMismatch,
                        at: cursor,
                        detail: format!("expected '{}'", word),
                    });
                }
            }
            PatternPart::Variable {
                name,
                optional,
                constraint,
            } => {
                let stop = parts[position + 1..]
                    .iter()
                    .find_map(PatternPart::literal_word);
                let capture = capture_end(stream, cursor, end, stop);

                if capture == cursor {
                    if *optional {
                        bindings.push((name.clone(), None));
                        continue;
                    }
                    return Err(Failure {
                        kind: FailureKind::EmptyCapture,
                        at: cursor,
                        detail: format!(
                            "required placeholder ${} in '{}' captured nothing",
                            name, candidate.pattern.source
                        ),
                    });
                }

                if let (Some(expected), Some(first)) = (constraint, stream.get(cursor)) {
                    let found = CoarseType::of_token(first);
                    if found != *expected {
                        if *optional {
                            bindings.push((name.clone(), None));
                            continue;
                        }
                        return Err(Failure {
                            kind: FailureKind::TypeMismatch,
                            at: cursor,
                            detail: format!("${} expects {} but found {}", name, expected, found),
                        });
                    }
                }

                bindings.push((name.clone(), Some((cursor, capture))));
                cursor = capture;
            }
        }
    }
    Ok((bindings, cursor))
}

/// Index where a capture starting at `from` stops.
///
/// At nesting level 0 the capture stops before, in order of precedence: the `stop` word
/// (the next literal of the pattern, unless it is a member name after `.` or `::`); a closing delimiter; a statement-introducing keyword
/// (`ARRAY` directly after `NEW` excepted); any pattern keyword; an operand directly after a
/// completed operand. Brackets opened inside the capture are balanced first.
pub fn capture_end(stream: &TokenStream, from: usize, end: usize, stop: Option<&str>) -> usize {
    let mut depth = 0usize;
    let mut after_operand = false;
    let mut index = from;

    while index < end {
        let Some(token) = stream.get(index) else {
            break;
        };

        if depth == 0 {
            if stop.is_some_and(|word| is_stop_word(stream, index, word)) {
                break;
            }
            let previous = index.checked_sub(1).and_then(|i| stream.get(i));
            if is_capture_boundary(token, previous) {
                break;
            }
            if after_operand && starts_operand(token) {
                break;
            }
        }

        match token.kind {
            TokenKind::Delimiter(d) if d.is_opener() => depth += 1,
            TokenKind::Delimiter(d) if d.is_closer() => depth = depth.saturating_sub(1),
            _ => {}
        }
        after_operand = depth == 0 && ends_operand(token);
        index += 1;
    }
    index
}

/// Whether the token at `index` reads as the pattern literal `word`. A member name keeps
/// its identifier reading even when it spells a pattern word.
fn is_stop_word(stream: &TokenStream, index: usize, word: &str) -> bool {
    let Some(token) = stream.get(index) else {
        return false;
    };
    if token.raw.normalized != word {
        return false;
    }
    let member = index
        .checked_sub(1)
        .and_then(|i| stream.get(i))
        .is_some_and(|p| {
            matches!(
                p.kind,
                TokenKind::Operator(Operator::Dot | Operator::HostAccess)
            )
        });
    !member
}

fn is_capture_boundary(token: &Token, previous: Option<&Token>) -> bool {
    match token.kind {
        TokenKind::Delimiter(d) => d.is_closer(),
        TokenKind::Keyword(Keyword::Array) => {
            !previous.is_some_and(|p| p.is_keyword(Keyword::New))
        }
        TokenKind::Keyword(k) => k.introduces_statement(),
        TokenKind::PatternKeyword(_) => true,
        _ => false,
    }
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Literal(_)
            | TokenKind::Identifier
            | TokenKind::Operator(Operator::HostPrefix)
            | TokenKind::Keyword(Keyword::New)
            | TokenKind::Delimiter(Delimiter::LBrace)
    )
}

fn ends_operand(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Literal(_)
            | TokenKind::Identifier
            | TokenKind::Delimiter(Delimiter::RParen | Delimiter::RBracket | Delimiter::RBrace)
    )
}

/// Builds the call arguments in transformation order.
fn substitute(
    stream: &TokenStream,
    candidate: &SyntaxTransformation,
    bindings: &Bindings,
) -> Result<Vec<Expr>, QuillError> {
    candidate
        .transformation
        .args
        .iter()
        .map(|arg| match arg {
            TransformArg::Literal(literal) => Ok(Expr::Literal(literal.clone())),
            TransformArg::Variable { name, default } => {
                let bound = bindings
                    .iter()
                    .find(|(n, _)| n == name)
                    .and_then(|(_, range)| *range);
                match bound {
                    Some((from, to)) => parse_span(stream, from, to),
                    None => Ok(Expr::Literal(default.clone().unwrap_or(Literal::Null))),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;
    use crate::patterns::std::standard_registry;
    use crate::syntax::{classify, RawToken};

    fn stream(words: &[&str], registry: &PatternRegistry) -> TokenStream {
        TokenStream::new(classify(&RawToken::from_words(words.iter().copied()), registry).unwrap())
    }

    #[test]
    fn test_take_reorders_arguments() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["TAKE", "3", "FROM", "items"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(rewrite.function, "ARRAY_TAKE");
        assert_eq!(rewrite.args, vec![Expr::ident("items"), Expr::int(3)]);
        assert_eq!(rewrite.next, 4);
    }

    #[test]
    fn test_sort_falls_through_to_default_order() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["SORT", "nums"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(rewrite.function, "ARRAY_SORT");
        assert_eq!(rewrite.args, vec![Expr::ident("nums"), Expr::string("ASC")]);
    }

    #[test]
    fn test_sort_by_takes_precedence() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["SORT", "people", "BY", "age"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(rewrite.function, "ARRAY_SORT_BY");
    }

    #[test]
    fn test_capture_balances_brackets() {
        let registry = standard_registry().unwrap();
        let tokens = stream(
            &["TAKE", "f", "(", "a", ",", "b", ")", "FROM", "items", "PRINT", "1"],
            &registry,
        );
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert!(matches!(rewrite.args[1], Expr::Call { .. }));
        assert_eq!(rewrite.next, 9);
    }

    #[test]
    fn test_trailing_capture_stops_at_adjacent_operand() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["REVERSE", "items", "x", "=", "1"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(rewrite.args, vec![Expr::ident("items")]);
        assert_eq!(rewrite.next, 2);
    }

    #[test]
    fn test_empty_required_capture_is_pattern_configuration() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["TAKE", "FROM", "items"], &registry);
        let err = rewrite(&tokens, 0, &registry).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::PatternConfiguration);
    }

    #[test]
    fn test_type_constraint_mismatch_fails_candidate() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["WAIT", "\"soon\""], &registry);
        let err = rewrite(&tokens, 0, &registry).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
        assert!(err.to_string().contains("WAIT"));
    }

    #[test]
    fn test_member_name_does_not_end_capture() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["TAKE", "obj", ".", "from", "FROM", "items"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(
            rewrite.args,
            vec![
                Expr::ident("items"),
                Expr::Property {
                    target: Box::new(Expr::ident("obj")),
                    name: "from".into(),
                },
            ]
        );
        assert_eq!(rewrite.next, 6);
    }

    #[test]
    fn test_optional_constrained_variable_mismatch_stays_unbound() {
        let mut registry = PatternRegistry::new();
        registry
            .register("SORT $array ORDER? $order:STRING?", r#"ARRAY_SORT($array, $order="ASC")"#)
            .unwrap();
        let tokens = stream(&["SORT", "nums", "ORDER", "3"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(rewrite.args, vec![Expr::ident("nums"), Expr::string("ASC")]);
        assert_eq!(rewrite.next, 3);
    }

    #[test]
    fn test_optional_literal_is_consumed_when_present() {
        let registry = standard_registry().unwrap();
        let tokens = stream(&["WAIT", "250", "MILLISECONDS"], &registry);
        let rewrite = rewrite(&tokens, 0, &registry).unwrap();
        assert_eq!(rewrite.args, vec![Expr::int(250)]);
        assert_eq!(rewrite.next, 3);
    }
}
