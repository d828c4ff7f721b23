use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    decimal::Decimal,
    lex::{Token, TokenKind, TokenSequence, tokenize},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no expression was given")]
    #[diagnostic(code(validate::empty_input), help("type an expression such as `(1+2)*3`"))]
    EmptyInput,

    #[error("unexpected character '{ch}'")]
    #[diagnostic(
        code(validate::invalid_character),
        help("only digits, `.`, `+ - * /` and brackets may appear")
    )]
    InvalidCharacter {
        ch: char,
        #[label("this character")]
        span: SourceSpan,
    },

    #[error("brackets do not pair up")]
    #[diagnostic(code(validate::unbalanced_brackets))]
    UnbalancedBrackets {
        #[label("this bracket has no partner")]
        span: SourceSpan,
    },

    #[error("empty brackets")]
    #[diagnostic(
        code(validate::empty_brackets),
        help("put an expression between the brackets or remove them")
    )]
    EmptyBrackets {
        #[label("nothing in here")]
        span: SourceSpan,
    },

    #[error("`{text}` is not a number")]
    #[diagnostic(
        code(validate::invalid_operand),
        help("a number has digits and at most one decimal point")
    )]
    InvalidOperand {
        text: String,
        #[label("this operand")]
        span: SourceSpan,
    },

    #[error("malformed expression")]
    #[diagnostic(
        code(validate::invalid_structure),
        help("numbers and operators must alternate, e.g. `1 + 2 * 3`")
    )]
    InvalidStructure {
        #[label("not expected here")]
        span: SourceSpan,
    },
}

const ALPHABET: &[char] = &['.', '+', '-', '*', '/', '(', ')'];

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || ALPHABET.contains(&c)
}

/// Checks `input` and hands back its tokens when it is a well-formed
/// expression. The first failing check wins.
pub fn validate(input: &str) -> Result<TokenSequence, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if let Some((byte, ch)) = input.char_indices().find(|&(_, c)| !is_allowed(c)) {
        return Err(ValidationError::InvalidCharacter {
            ch,
            span: SourceSpan::from(byte..byte + ch.len_utf8()),
        });
    }

    let tokens = tokenize(input);
    trace!(%tokens, "tokenized");

    check_balance(tokens.tokens())?;
    check_empty_brackets(tokens.tokens())?;
    check_structure(tokens.tokens())?;
    check_bracket_placement(tokens.tokens())?;

    debug!(tokens = tokens.len(), "expression is valid");
    Ok(tokens)
}

fn check_balance(tokens: &[Token]) -> Result<(), ValidationError> {
    // offsets of the left brackets still waiting for a partner
    let mut open = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::LeftBracket => open.push(token.span),
            TokenKind::RightBracket => {
                if open.pop().is_none() {
                    return Err(ValidationError::UnbalancedBrackets { span: token.span });
                }
            }
            _ => {}
        }
    }
    match open.first() {
        Some(&span) => Err(ValidationError::UnbalancedBrackets { span }),
        None => Ok(()),
    }
}

fn check_empty_brackets(tokens: &[Token]) -> Result<(), ValidationError> {
    let mut just_opened: Option<SourceSpan> = None;
    for token in tokens {
        match (&token.kind, just_opened) {
            (TokenKind::LeftBracket, _) => just_opened = Some(token.span),
            (TokenKind::RightBracket, Some(left)) => {
                let end = token.span.offset() + token.span.len();
                return Err(ValidationError::EmptyBrackets {
                    span: SourceSpan::from(left.offset()..end),
                });
            }
            _ => just_opened = None,
        }
    }
    Ok(())
}

/// With brackets set aside the tokens must read `operand (operator operand)*`.
fn check_structure(tokens: &[Token]) -> Result<(), ValidationError> {
    let flat: Vec<&Token> = tokens.iter().filter(|t| !t.is_bracket()).collect();

    for (i, token) in flat.iter().enumerate() {
        match (&token.kind, i % 2 == 0) {
            (TokenKind::Number(text), true) => {
                if text.parse::<Decimal>().is_err() {
                    return Err(ValidationError::InvalidOperand {
                        text: text.clone(),
                        span: token.span,
                    });
                }
            }
            (TokenKind::Operator(_), false) => {}
            _ => return Err(ValidationError::InvalidStructure { span: token.span }),
        }
    }

    match flat.last() {
        Some(last) if flat.len() % 2 == 0 => {
            Err(ValidationError::InvalidStructure { span: last.span })
        }
        Some(_) => Ok(()),
        None => Err(ValidationError::InvalidStructure {
            span: SourceSpan::from(0..0),
        }),
    }
}

/// Catches what the flat walk cannot see: `(1+)2`, `(1)(2)` and a numeral
/// split by a bracket as in `1(2)`.
fn check_bracket_placement(tokens: &[Token]) -> Result<(), ValidationError> {
    let invalid = |token: &Token| ValidationError::InvalidStructure { span: token.span };

    for (i, token) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| &tokens[p]);
        let next = tokens.get(i + 1);

        if let Some(prev) = prev {
            // the lexer emits `(` before the numeral it interrupted
            if token.span.offset() < prev.span.offset() + prev.span.len() {
                return Err(invalid(token));
            }
        }

        match token.kind {
            TokenKind::LeftBracket => {
                if let Some(Token {
                    kind: TokenKind::Number(_) | TokenKind::RightBracket,
                    ..
                }) = prev
                {
                    return Err(invalid(token));
                }
            }
            TokenKind::RightBracket => {
                if let Some(
                    after @ Token {
                        kind: TokenKind::Number(_) | TokenKind::LeftBracket,
                        ..
                    },
                ) = next
                {
                    return Err(invalid(after));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_well_formed_expressions() {
        for ok in ["1", "1+2", "(1+2)*3", "((1+2)*(3-1))", "1.5/.5", "10/3", "((7))"] {
            assert!(validate(ok).is_ok(), "{ok} should validate");
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(validate(""), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn invalid_character_reports_first_offender() {
        assert_eq!(
            validate("1+2a"),
            Err(ValidationError::InvalidCharacter {
                ch: 'a',
                span: SourceSpan::from(3..4),
            })
        );
        assert!(matches!(
            validate("1 + 2"),
            Err(ValidationError::InvalidCharacter { ch: ' ', .. })
        ));
        assert!(matches!(
            validate("√4"),
            Err(ValidationError::InvalidCharacter { ch: '√', .. })
        ));
    }

    #[test]
    fn unbalanced_brackets() {
        assert_eq!(
            validate("1+2)"),
            Err(ValidationError::UnbalancedBrackets {
                span: SourceSpan::from(3..4),
            })
        );
        assert_eq!(
            validate("(1+(2"),
            Err(ValidationError::UnbalancedBrackets {
                span: SourceSpan::from(0..1),
            })
        );
        assert!(matches!(
            validate(")1+2("),
            Err(ValidationError::UnbalancedBrackets { .. })
        ));
    }

    #[test]
    fn empty_brackets() {
        assert_eq!(
            validate("()"),
            Err(ValidationError::EmptyBrackets {
                span: SourceSpan::from(0..2),
            })
        );
        assert!(matches!(
            validate("1+(())"),
            Err(ValidationError::EmptyBrackets { .. })
        ));
    }

    #[test]
    fn balance_is_checked_before_emptiness() {
        assert!(matches!(
            validate("())"),
            Err(ValidationError::UnbalancedBrackets { .. })
        ));
    }

    #[test]
    fn invalid_operand() {
        assert_eq!(
            validate("1.2.3+4"),
            Err(ValidationError::InvalidOperand {
                text: "1.2.3".to_string(),
                span: SourceSpan::from(0..5),
            })
        );
        assert!(matches!(
            validate("1+."),
            Err(ValidationError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn invalid_structure() {
        for bad in ["1++2", "+1", "1+", "1*", "-1", "(1)(2)", "*"] {
            assert!(
                matches!(validate(bad), Err(ValidationError::InvalidStructure { .. })),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn misplaced_brackets() {
        for bad in ["1(2)", "(1+)2", "1(+2)", "(2)3", "(1*)(2)"] {
            assert!(
                matches!(validate(bad), Err(ValidationError::InvalidStructure { .. })),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn returns_tokens_on_success() {
        let tokens = validate("(1+2)*3").unwrap();
        assert_eq!(tokens, tokenize("(1+2)*3"));
        assert_eq!(tokens.len(), 7);
    }
}
