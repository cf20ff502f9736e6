//! Lexical context stack.
//!
//! The stack answers one question for the classifier: may an arbitrary word be treated as a
//! pattern keyword here? It never empties; `Root` stays at the bottom for the whole run.
//! Ephemeral contexts govern exactly one token and are popped before the next one.

use tracing::trace;

use crate::syntax::token::{Delimiter, Keyword, Operator, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalContext {
    /// Top level of the program.
    Root,
    /// Inside `{ ... }`.
    Block,
    /// Inside call parentheses `( ... )`.
    Argument,
    /// Inside `[ ... ]`.
    ArrayLiteral,
    /// Right after an assignment or comparison operator.
    Expression,
    /// Right after `.` or `::`; the next token must be a plain name.
    MemberAccess,
    /// Right after a type keyword, `VAR` or `RETURN`.
    SingleToken,
}

impl LexicalContext {
    pub fn allows_pattern_keywords(&self) -> bool {
        matches!(self, LexicalContext::Root | LexicalContext::Block)
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self,
            LexicalContext::Expression | LexicalContext::MemberAccess | LexicalContext::SingleToken
        )
    }

    /// The context a closing delimiter ends, if any.
    fn closed_by(closer: Delimiter) -> Option<LexicalContext> {
        match closer {
            Delimiter::RParen => Some(LexicalContext::Argument),
            Delimiter::RBracket => Some(LexicalContext::ArrayLiteral),
            Delimiter::RBrace => Some(LexicalContext::Block),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<LexicalContext>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    pub fn new() -> Self {
        Self {
            frames: vec![LexicalContext::Root],
        }
    }

    pub fn current(&self) -> LexicalContext {
        // the root frame is never popped
        self.frames.last().copied().unwrap_or(LexicalContext::Root)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, context: LexicalContext) {
        self.frames.push(context);
    }

    /// Pops the top frame. The root frame is never removed.
    pub fn pop(&mut self) -> Option<LexicalContext> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn pop_ephemeral(&mut self) {
        if self.current().is_ephemeral() {
            self.pop();
        }
    }

    /// Ends the innermost context opened by the matching opener. Frames above it (left open by
    /// unbalanced input) are discarded with it; an unmatched closer leaves the stack unchanged.
    pub fn close(&mut self, closer: Delimiter) {
        let Some(target) = LexicalContext::closed_by(closer) else {
            return;
        };
        let Some(position) = self.frames.iter().rposition(|frame| *frame == target) else {
            return;
        };
        if position == 0 {
            return;
        }
        self.frames.truncate(position);
    }

    /// The side effect run before each classification, driven by the previous token.
    pub fn advance(&mut self, previous: Option<&TokenKind>) {
        self.pop_ephemeral();
        let Some(previous) = previous else {
            return;
        };
        let pushed = match previous {
            TokenKind::Operator(Operator::Dot | Operator::HostAccess) => {
                Some(LexicalContext::MemberAccess)
            }
            TokenKind::Operator(op) if *op == Operator::Assign || op.is_comparison() => {
                Some(LexicalContext::Expression)
            }
            TokenKind::Delimiter(Delimiter::LParen) => Some(LexicalContext::Argument),
            TokenKind::Delimiter(Delimiter::LBracket) => Some(LexicalContext::ArrayLiteral),
            TokenKind::Delimiter(Delimiter::LBrace) => Some(LexicalContext::Block),
            TokenKind::Delimiter(d) if d.is_closer() => {
                self.close(*d);
                None
            }
            TokenKind::Keyword(k) if k.is_type() || matches!(k, Keyword::Var | Keyword::Return) => {
                Some(LexicalContext::SingleToken)
            }
            _ => None,
        };
        if let Some(context) = pushed {
            trace!(?context, depth = self.depth() + 1, "push lexical context");
            self.push(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_never_popped() {
        let mut stack = ContextStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), LexicalContext::Root);
        stack.close(Delimiter::RBrace);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_ephemeral_context_lasts_one_token() {
        let mut stack = ContextStack::new();
        stack.advance(Some(&TokenKind::Operator(Operator::Dot)));
        assert_eq!(stack.current(), LexicalContext::MemberAccess);
        stack.advance(Some(&TokenKind::Identifier));
        assert_eq!(stack.current(), LexicalContext::Root);
    }

    #[test]
    fn test_brackets_nest_and_close() {
        let mut stack = ContextStack::new();
        stack.advance(Some(&TokenKind::Delimiter(Delimiter::LBrace)));
        stack.advance(Some(&TokenKind::Delimiter(Delimiter::LParen)));
        assert_eq!(stack.current(), LexicalContext::Argument);
        assert!(!stack.current().allows_pattern_keywords());
        stack.advance(Some(&TokenKind::Delimiter(Delimiter::RParen)));
        assert_eq!(stack.current(), LexicalContext::Block);
        assert!(stack.current().allows_pattern_keywords());
        stack.advance(Some(&TokenKind::Delimiter(Delimiter::RBrace)));
        assert_eq!(stack.current(), LexicalContext::Root);
    }

    #[test]
    fn test_unmatched_closer_leaves_stack() {
        let mut stack = ContextStack::new();
        stack.advance(Some(&TokenKind::Delimiter(Delimiter::LBracket)));
        stack.advance(Some(&TokenKind::Delimiter(Delimiter::RParen)));
        assert_eq!(stack.current(), LexicalContext::ArrayLiteral);
    }

    #[test]
    fn test_type_keyword_pushes_single_token_context() {
        let mut stack = ContextStack::new();
        stack.advance(Some(&TokenKind::Keyword(Keyword::Int)));
        assert_eq!(stack.current(), LexicalContext::SingleToken);
        assert!(stack.current().is_ephemeral());
    }
}
