pub mod config;
pub mod decimal;
pub mod eval;
pub mod lex;
pub mod validate;

pub use config::EvalConfig;
pub use decimal::{Decimal, ParseDecimalError, RoundingMode};
pub use eval::{ComputationError, evaluate};
pub use lex::{Lexer, Operator, Token, TokenKind, TokenSequence, tokenize};
pub use validate::{ValidationError, validate};

/// One line of input.
///
/// Holds on to the tokens produced by a successful [`Expression::validate`] so
/// that evaluation can reuse them. The tokens are present exactly when the
/// last validation of this text succeeded.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    tokens: Option<TokenSequence>,
}

impl Expression {
    pub fn new(source: impl Into<String>) -> Self {
        Expression {
            source: source.into(),
            tokens: None,
        }
    }

    pub fn is_validated(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn validate(&mut self) -> Result<&TokenSequence, ValidationError> {
        self.tokens = None;
        let tokens = validate(&self.source)?;
        Ok(self.tokens.insert(tokens))
    }

    /// Fails with [`ComputationError::NotValidated`] unless
    /// [`Expression::validate`] succeeded first.
    pub fn evaluate(&self, config: &EvalConfig) -> Result<Decimal, ComputationError> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or(ComputationError::NotValidated)?;
        evaluate(tokens, config)
    }
}

/// Stateless entry point: every call works on its own [`Expression`].
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    config: EvalConfig,
}

impl Calculator {
    pub fn new(config: EvalConfig) -> Self {
        Calculator { config }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self, input: &str) -> Result<TokenSequence, ValidationError> {
        validate(input)
    }

    /// `None` stands for "no input at all" and is reported like an empty line.
    pub fn validate_opt(&self, input: Option<&str>) -> Result<TokenSequence, ValidationError> {
        self.validate(input.unwrap_or_default())
    }

    /// Evaluates `input`, which the caller is expected to have validated.
    /// Text that does not validate is refused with
    /// [`ComputationError::NotValidated`] rather than computed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn evaluate(&self, input: &str) -> Result<Decimal, ComputationError> {
        let mut expression = Expression::new(input);
        if let Err(error) = expression.validate() {
            tracing::warn!(%error, "refusing to evaluate invalid input");
            return Err(ComputationError::NotValidated);
        }
        expression.evaluate(&self.config)
    }
}
