use std::fmt::Display;

use miette::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Operator> {
        Some(match c {
            '+' => Operator::Add,
            '-' => Operator::Sub,
            '*' => Operator::Mul,
            '/' => Operator::Div,
            _ => return None,
        })
    }

    pub fn is_multiplicative(self) -> bool {
        matches!(self, Operator::Mul | Operator::Div)
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Number(String),
    Operator(Operator),
    LeftBracket,
    RightBracket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Bytes of the source this token was read from. For a numeral this runs
    /// from its first to its last character.
    pub span: SourceSpan,
}

impl Token {
    pub fn is_bracket(&self) -> bool {
        matches!(self.kind, TokenKind::LeftBracket | TokenKind::RightBracket)
    }

    /// Source form of the token: the numeral text or the symbol.
    pub fn literal(&self) -> String {
        match &self.kind {
            TokenKind::Number(text) => text.clone(),
            TokenKind::Operator(op) => op.symbol().to_string(),
            TokenKind::LeftBracket => "(".to_string(),
            TokenKind::RightBracket => ")".to_string(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TokenKind::Number(text) => write!(f, "NUMBER {text}"),
            TokenKind::Operator(Operator::Add) => write!(f, "PLUS +"),
            TokenKind::Operator(Operator::Sub) => write!(f, "MINUS -"),
            TokenKind::Operator(Operator::Mul) => write!(f, "STAR *"),
            TokenKind::Operator(Operator::Div) => write!(f, "SLASH /"),
            TokenKind::LeftBracket => write!(f, "LEFT_BRACKET ("),
            TokenKind::RightBracket => write!(f, "RIGHT_BRACKET )"),
        }
    }
}

/// Tokens in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence(Vec<Token>);

impl TokenSequence {
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        TokenSequence(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for TokenSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for token in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", token.literal())?;
        }
        Ok(())
    }
}

pub fn tokenize(input: &str) -> TokenSequence {
    Lexer::new(input).collect()
}

/// Splits text into tokens. Never fails: characters outside the calculator's
/// alphabet are skipped here and reported by the validator.
pub struct Lexer<'de> {
    rest: &'de str,
    byte: usize,
    numeral: String,
    numeral_span: Option<(usize, usize)>,
    queued: Option<Token>,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            rest: input,
            byte: 0,
            numeral: String::new(),
            numeral_span: None,
            queued: None,
        }
    }

    /// Hands out the pending numeral, if there is one.
    fn flush(&mut self) -> Option<Token> {
        let (start, end) = self.numeral_span.take()?;
        Some(Token {
            kind: TokenKind::Number(std::mem::take(&mut self.numeral)),
            span: SourceSpan::from(start..end),
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(queued) = self.queued.take() {
            return Some(queued);
        }
        loop {
            let mut chars = self.rest.chars();
            let Some(c) = chars.next() else {
                return self.flush();
            };
            let start = self.byte;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();
            let span = SourceSpan::from(start..self.byte);

            let kind = match c {
                '0'..='9' | '.' => {
                    self.numeral.push(c);
                    self.numeral_span = Some(match self.numeral_span {
                        Some((first, _)) => (first, self.byte),
                        None => (start, self.byte),
                    });
                    continue;
                }
                // Never terminates a numeral: `(` cannot follow one in a valid
                // expression, and the validator rejects the case where it does.
                '(' => {
                    return Some(Token {
                        kind: TokenKind::LeftBracket,
                        span,
                    });
                }
                ')' => TokenKind::RightBracket,
                c => match Operator::from_char(c) {
                    Some(op) => TokenKind::Operator(op),
                    None => continue,
                },
            };

            let token = Token { kind, span };
            return match self.flush() {
                Some(number) => {
                    self.queued = Some(token);
                    Some(number)
                }
                None => Some(token),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn literals(input: &str) -> Vec<String> {
        tokenize(input).iter().map(Token::literal).collect()
    }

    #[test]
    fn splits_numbers_operators_and_brackets() {
        assert_eq!(
            literals("(1.5+22)*3"),
            vec!["(", "1.5", "+", "22", ")", "*", "3"]
        );
    }

    #[test]
    fn trailing_numeral_is_flushed_once() {
        assert_eq!(literals("1+2"), vec!["1", "+", "2"]);
    }

    #[test]
    fn no_empty_numeral_at_end() {
        assert_eq!(literals("(1+2)"), vec!["(", "1", "+", "2", ")"]);
        assert_eq!(literals("1+"), vec!["1", "+"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn left_bracket_does_not_flush() {
        let tokens = tokenize("1(2)");
        assert_eq!(
            tokens.iter().map(Token::literal).collect::<Vec<_>>(),
            vec!["(", "12", ")"]
        );
        // the numeral's span straddles the bracket
        assert_eq!(tokens.tokens()[1].span, SourceSpan::from(0..3));
    }

    #[test]
    fn unknown_characters_are_skipped() {
        assert_eq!(literals("1+2a"), vec!["1", "+", "2"]);
    }

    #[test]
    fn spans_point_into_source() {
        let tokens = tokenize("10/(3)");
        let spans: Vec<_> = tokens.iter().map(|t| t.span).collect();
        assert_eq!(
            spans,
            vec![
                SourceSpan::from(0..2),
                SourceSpan::from(2..3),
                SourceSpan::from(3..4),
                SourceSpan::from(4..5),
                SourceSpan::from(5..6),
            ]
        );
    }

    #[test]
    fn display_names_each_token() {
        let shown: Vec<_> = tokenize("1-(2/3)").iter().map(|t| t.to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "NUMBER 1",
                "MINUS -",
                "LEFT_BRACKET (",
                "NUMBER 2",
                "SLASH /",
                "NUMBER 3",
                "RIGHT_BRACKET )",
            ]
        );
        assert_eq!(tokenize("(1+2)*3").to_string(), "( 1 + 2 ) * 3");
    }
}
