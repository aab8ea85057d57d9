use thiserror::Error;

/// The fixed set of error codes surfaced by the engine.
///
/// The human-readable message attached to an error is the code itself;
/// callers localize separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnrecognizedExpression,
    EmptyValue,
    LimitExceeded,
    StringLiteralNotTerminated,
    TokenNotFound,
    UnexpectedCharacter,
    MisusedDoubleQuotes,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnrecognizedExpression => "UnrecognizedExpression",
            ErrorCode::EmptyValue => "EmptyValue",
            ErrorCode::LimitExceeded => "LimitExceeded",
            ErrorCode::StringLiteralNotTerminated => "StringLiteralNotTerminated",
            ErrorCode::TokenNotFound => "TokenNotFound",
            ErrorCode::UnexpectedCharacter => "UnexpectedCharacter",
            ErrorCode::MisusedDoubleQuotes => "MisusedDoubleQuotes",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while scanning, parsing, or resolving an expression.
///
/// Each variant corresponds to one layer of the engine and carries a fixed
/// [`ErrorCode`]. Every error is terminal for the current parse or resolve
/// call; there is no retry or per-leaf isolation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Workflow.ExpressionScannerException: {0}")]
    Scanner(ErrorCode),

    #[error("Workflow.ExpressionParserException: {0}")]
    Parser(ErrorCode),

    #[error("Workflow.ExpressionException: {0}")]
    Evaluation(ErrorCode),
}

impl ExpressionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExpressionError::Scanner(code)
            | ExpressionError::Parser(code)
            | ExpressionError::Evaluation(code) => *code,
        }
    }

    /// The fixed category name identifying the layer the error came from.
    pub fn category(&self) -> &'static str {
        match self {
            ExpressionError::Scanner(_) => "Workflow.ExpressionScannerException",
            ExpressionError::Parser(_) => "Workflow.ExpressionParserException",
            ExpressionError::Evaluation(_) => "Workflow.ExpressionException",
        }
    }
}
