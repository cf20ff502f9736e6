//! Relational and logical conditions for `IF`, `ELSE IF` and `LOOP WHILE`.
//!
//! `OR` binds loosest, then `AND`, then `NOT`, then a single comparison or a bare
//! truth-valued expression. A parenthesized group is read as a nested condition unless an
//! operator after the closing parenthesis shows it was an arithmetic operand.

use crate::ast::{CompareOp, Condition};
use crate::diagnostics::{ErrorType, QuillError};
use crate::parser::expr::ExprParser;
use crate::syntax::token::{Delimiter, Keyword, Operator, TokenKind};

impl<'s> ExprParser<'s> {
    pub fn parse_condition(&mut self) -> Result<Condition, QuillError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Condition, QuillError> {
        let mut lhs = self.parse_and()?;
        while self.at_keyword(Keyword::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Condition, QuillError> {
        let mut lhs = self.parse_not()?;
        while self.at_keyword(Keyword::And) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Condition, QuillError> {
        if self.at_keyword(Keyword::Not) {
            self.advance();
            let inner = self.descend(Self::parse_not)?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        if let Some(group) = self.try_group()? {
            return Ok(group);
        }
        self.parse_comparison()
    }

    /// Reads `( condition )` when the parentheses group a whole condition. Leaves the cursor
    /// where it was and returns `None` otherwise.
    fn try_group(&mut self) -> Result<Option<Condition>, QuillError> {
        if !self.at_delimiter(Delimiter::LParen) {
            return Ok(None);
        }
        let start = self.position();
        self.advance();

        let grouped = match self.descend(Self::parse_or) {
            Ok(inner) if self.at_delimiter(Delimiter::RParen) => {
                self.advance();
                Some(inner)
            }
            Err(e) if e.error_type() == ErrorType::StructuralRule => return Err(e),
            _ => None,
        };
        match grouped {
            Some(inner) if !self.continues_operand() => Ok(Some(inner)),
            _ => {
                self.rewind(start);
                Ok(None)
            }
        }
    }

    /// True when the token under the cursor extends an expression rather than a condition.
    fn continues_operand(&self) -> bool {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Operator(op)) => op != Operator::Assign,
            Some(TokenKind::Delimiter(Delimiter::LBracket | Delimiter::LParen)) => true,
            _ => false,
        }
    }

    fn parse_comparison(&mut self) -> Result<Condition, QuillError> {
        let lhs = self.parse_expression()?;
        let Some(op) = self.peek().and_then(|t| compare_op(t.kind)) else {
            return Ok(Condition::Truthy(lhs));
        };
        self.advance();
        let rhs = self.parse_expression()?;
        Ok(Condition::Compare { lhs, op, rhs })
    }
}

fn compare_op(kind: TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Operator(Operator::Eq) => Some(CompareOp::Eq),
        TokenKind::Operator(Operator::NotEq) => Some(CompareOp::NotEq),
        TokenKind::Operator(Operator::Lt) => Some(CompareOp::Lt),
        TokenKind::Operator(Operator::Gt) => Some(CompareOp::Gt),
        TokenKind::Operator(Operator::LtEq) => Some(CompareOp::LtEq),
        TokenKind::Operator(Operator::GtEq) => Some(CompareOp::GtEq),
        _ => None,
    }
}
