use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::EvalConfig,
    decimal::Decimal,
    lex::{Operator, Token, TokenKind, TokenSequence},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ComputationError {
    #[error("expression was evaluated without being validated")]
    #[diagnostic(
        code(eval::not_validated),
        help("validate the expression first and only evaluate it when that succeeds")
    )]
    NotValidated,

    #[error("division by zero")]
    #[diagnostic(code(eval::division_by_zero))]
    DivisionByZero {
        #[label("this divisor is zero")]
        span: SourceSpan,
    },

    #[error("brackets nest deeper than {limit} levels")]
    #[diagnostic(
        code(eval::too_deeply_nested),
        help("flatten the expression or raise the nesting limit")
    )]
    TooDeeplyNested {
        limit: usize,
        #[label("this bracket")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone)]
enum ItemKind {
    Value(Decimal),
    Op(Operator),
    Open,
    Close,
}

/// Working form of a token: numerals already parsed, spans kept for errors.
#[derive(Debug, Clone)]
struct Item {
    kind: ItemKind,
    span: SourceSpan,
}

impl TryFrom<&Token> for Item {
    type Error = ComputationError;

    fn try_from(token: &Token) -> Result<Self, Self::Error> {
        let kind = match &token.kind {
            TokenKind::Number(text) => {
                ItemKind::Value(text.parse().map_err(|_| ComputationError::NotValidated)?)
            }
            TokenKind::Operator(op) => ItemKind::Op(*op),
            TokenKind::LeftBracket => ItemKind::Open,
            TokenKind::RightBracket => ItemKind::Close,
        };
        Ok(Item {
            kind,
            span: token.span,
        })
    }
}

fn join(first: SourceSpan, last: SourceSpan) -> SourceSpan {
    SourceSpan::from(first.offset()..last.offset() + last.len())
}

/// Computes the value of a validated token sequence.
///
/// Bracket spans are replaced by their values left to right, recursing into
/// nested ones; then `*` and `/` are collapsed left to right, then `+` and
/// `-`. A sequence that does not have the shape validation guarantees yields
/// [`ComputationError::NotValidated`].
pub fn evaluate(tokens: &TokenSequence, config: &EvalConfig) -> Result<Decimal, ComputationError> {
    let mut items = tokens
        .iter()
        .map(Item::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let result = collapse(&mut items, 0, config)?;
    debug!(%result, "evaluated");
    Ok(result)
}

fn collapse(
    items: &mut Vec<Item>,
    depth: usize,
    config: &EvalConfig,
) -> Result<Decimal, ComputationError> {
    resolve_brackets(items, depth, config)?;
    apply_pass(items, Operator::is_multiplicative, config)?;
    apply_pass(items, |op| !op.is_multiplicative(), config)?;

    if items.len() != 1 {
        return Err(ComputationError::NotValidated);
    }
    match items.pop() {
        Some(Item {
            kind: ItemKind::Value(value),
            ..
        }) => Ok(value),
        _ => Err(ComputationError::NotValidated),
    }
}

/// Replaces every bracket span, left to right, with the value inside it.
fn resolve_brackets(
    items: &mut Vec<Item>,
    depth: usize,
    config: &EvalConfig,
) -> Result<(), ComputationError> {
    while let Some(open) = items
        .iter()
        .position(|item| matches!(item.kind, ItemKind::Open))
    {
        if depth >= config.max_depth {
            return Err(ComputationError::TooDeeplyNested {
                limit: config.max_depth,
                span: items[open].span,
            });
        }
        let close = matching_close(items, open).ok_or(ComputationError::NotValidated)?;

        let mut inner: Vec<Item> = items.drain(open + 1..close).collect();
        let value = collapse(&mut inner, depth + 1, config)?;

        // the pair now sits at `open` and `open + 1`
        let span = join(items[open].span, items[open + 1].span);
        trace!(depth, %value, "resolved bracket");
        items.splice(
            open..open + 2,
            [Item {
                kind: ItemKind::Value(value),
                span,
            }],
        );
    }
    Ok(())
}

fn matching_close(items: &[Item], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, item) in items.iter().enumerate().skip(open) {
        match item.kind {
            ItemKind::Open => depth += 1,
            ItemKind::Close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Collapses `value op value` triples for the operators `selects` accepts.
fn apply_pass(
    items: &mut Vec<Item>,
    selects: impl Fn(Operator) -> bool,
    config: &EvalConfig,
) -> Result<(), ComputationError> {
    let mut i = 0;
    while i < items.len() {
        let op = match items[i].kind {
            ItemKind::Op(op) if selects(op) => op,
            _ => {
                i += 1;
                continue;
            }
        };
        if i == 0 || i + 1 >= items.len() {
            return Err(ComputationError::NotValidated);
        }

        let (lhs, rhs) = match (&items[i - 1].kind, &items[i + 1].kind) {
            (ItemKind::Value(lhs), ItemKind::Value(rhs)) => (lhs, rhs),
            _ => return Err(ComputationError::NotValidated),
        };
        let value = match op {
            Operator::Add => lhs.add(rhs),
            Operator::Sub => lhs.sub(rhs),
            Operator::Mul => lhs.mul(rhs),
            Operator::Div => lhs
                .checked_div(rhs, config.scale, config.rounding)
                .ok_or(ComputationError::DivisionByZero {
                    span: items[i + 1].span,
                })?,
        };
        trace!(%lhs, op = %op.symbol(), %rhs, %value, "collapsed");

        let span = join(items[i - 1].span, items[i + 1].span);
        items.splice(
            i - 1..=i + 1,
            [Item {
                kind: ItemKind::Value(value),
                span,
            }],
        );
        // no advance: the next operator has moved to `i`
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decimal::RoundingMode, lex::tokenize, validate::validate};

    fn eval_with(input: &str, config: &EvalConfig) -> Result<String, ComputationError> {
        let tokens = validate(input).expect("test input should validate");
        evaluate(&tokens, config).map(|d| d.to_string())
    }

    fn eval(input: &str) -> Result<String, ComputationError> {
        eval_with(input, &EvalConfig::default())
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1+2*3").unwrap(), "7");
        assert_eq!(eval("2*3+1").unwrap(), "7");
        assert_eq!(eval("10-4-3").unwrap(), "3");
        assert_eq!(eval("2*3*4").unwrap(), "24");
        assert_eq!(eval("8/2/2").unwrap(), "2");
        assert_eq!(eval("1-2").unwrap(), "-1");
    }

    #[test]
    fn brackets() {
        assert_eq!(eval("(1+2)*3").unwrap(), "9");
        assert_eq!(eval("((1+2)*(3-1))").unwrap(), "6");
        assert_eq!(eval("(1+2)*(3+4)").unwrap(), "21");
        assert_eq!(eval("2*((1+1)*(2+(3-1)))").unwrap(), "16");
        assert_eq!(eval("(7)").unwrap(), "7");
    }

    #[test]
    fn sibling_groups_are_matched_independently() {
        assert_eq!(eval("(1+2)*(3+4)-(5*1)").unwrap(), "16");
        assert_eq!(eval("(10-(2+3))/(1+(4-0))").unwrap(), "1");
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        assert_eq!(eval("0.1+0.2").unwrap(), "0.3");
        assert_eq!(eval("1.5*2").unwrap(), "3.0");
        assert_eq!(eval("1-0.9").unwrap(), "0.1");
    }

    #[test]
    fn non_terminating_division_is_rounded() {
        let two_places = EvalConfig::default().with_scale(2);
        assert_eq!(eval_with("10/3", &two_places).unwrap(), "3.33");
        assert_eq!(eval_with("20/3", &two_places).unwrap(), "6.67");
        assert_eq!(eval("10/3").unwrap(), "3.3333333333");

        let truncating = two_places.with_rounding(RoundingMode::Down);
        assert_eq!(eval_with("20/3", &truncating).unwrap(), "6.66");
    }

    #[test]
    fn division_by_zero_aborts() {
        assert_eq!(
            eval("1/0"),
            Err(ComputationError::DivisionByZero {
                span: SourceSpan::from(2..3),
            })
        );
        assert!(matches!(
            eval("5+1/(2-2)*3"),
            Err(ComputationError::DivisionByZero { .. })
        ));
        assert!(matches!(
            eval("1/0.00"),
            Err(ComputationError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn zero_dividend_is_fine() {
        assert_eq!(eval("0/5").unwrap(), "0");
    }

    #[test]
    fn nesting_limit() {
        let shallow = EvalConfig::default().with_max_depth(2);
        assert_eq!(eval_with("((1))", &shallow).unwrap(), "1");
        assert_eq!(
            eval_with("(((1)))", &shallow),
            Err(ComputationError::TooDeeplyNested {
                limit: 2,
                span: SourceSpan::from(2..3),
            })
        );
    }

    #[test]
    fn unvalidated_sequences_are_rejected() {
        let config = EvalConfig::default();
        for bad in ["1++2", "1+", "()", "(1+2", "1.2.3", "", "1(2)+"] {
            assert_eq!(
                evaluate(&tokenize(bad), &config),
                Err(ComputationError::NotValidated),
                "{bad:?}"
            );
        }
    }
}
