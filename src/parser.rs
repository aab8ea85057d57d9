//! Recursive-descent parser turning template expression strings into
//! [`Expression`] trees.
//!
//! The grammar for a bare expression is:
//!
//! ```text
//! expr         := literal | functionCall
//! literal      := StringLiteral | IntegerLiteral | FloatLiteral
//!               | Identifier("null") | Identifier("true") | Identifier("false")
//! functionCall := Identifier "(" [expr ("," expr)*] ")" dereference*
//! dereference  := "?"? ("." Identifier | "[" expr "]")
//! ```

use crate::ast::{Dereference, Expression, FunctionExpression};
use crate::error::{ErrorCode, ExpressionError};
use crate::scanner::{ExpressionScanner, ExpressionToken, TokenKind};

/// Whether a string is recognized as expression syntax: at least two chars
/// long and either starting with `@` or containing `@{` past position 0.
pub fn is_template_expression(value: &str) -> bool {
    if value.chars().count() < 2 {
        return false;
    }
    value.starts_with('@') || value.find("@{").is_some_and(|at| at > 0)
}

/// Parses one bare expression; the whole input must be consumed.
///
/// With `alias_path_parsing` enabled, a bracket dereference whose index is
/// a plain string literal is split on `/` into one string step per segment
/// (legacy `['body/value']` syntax). The mode never propagates into nested
/// argument or index parses.
pub fn parse_expression(
    expression: &str,
    alias_path_parsing: bool,
) -> Result<Expression, ExpressionError> {
    let mut scanner = ExpressionScanner::new(expression)?;
    let parsed = parse_expression_inner(&mut scanner, alias_path_parsing)?;
    if scanner.take(TokenKind::EndOfData, None)?.is_none() {
        return Err(ExpressionError::Parser(ErrorCode::TokenNotFound));
    }
    Ok(parsed)
}

/// Parses a pre-classified template expression string.
///
/// `@@...` is an escaped `@` and yields a string literal of the text minus
/// its first char; `@` followed by anything but `{` parses the remainder as
/// a single function expression; everything else is parsed as a string
/// interpolation of literal runs and `@{...}` segments.
pub fn parse_template_expression(
    expression: &str,
    alias_path_parsing: bool,
) -> Result<Expression, ExpressionError> {
    if !is_template_expression(expression) {
        return Err(ExpressionError::Parser(ErrorCode::UnrecognizedExpression));
    }

    let chars: Vec<char> = expression.chars().collect();
    if chars[0] == '@' && chars.get(1) != Some(&'{') {
        if chars.get(1) == Some(&'@') {
            return Ok(Expression::StringLiteral(chars[1..].iter().collect()));
        }
        let remainder: String = chars[1..].iter().collect();
        return parse_expression(&remainder, alias_path_parsing);
    }

    parse_string_interpolation(&chars, alias_path_parsing)
}

/// Literal forms are tried first, in a fixed order; failing all of them the
/// parser commits to a function call.
fn parse_expression_inner(
    scanner: &mut ExpressionScanner,
    alias_path_parsing: bool,
) -> Result<Expression, ExpressionError> {
    if let Some(token) = scanner.take(TokenKind::StringLiteral, None)? {
        return Ok(Expression::StringLiteral(token.value));
    }
    if let Some(token) = scanner.take(TokenKind::IntegerLiteral, None)? {
        return Ok(Expression::NumberLiteral(token.value));
    }
    if let Some(token) = scanner.take(TokenKind::FloatLiteral, None)? {
        return Ok(Expression::NumberLiteral(token.value));
    }
    if let Some(token) = scanner.take(TokenKind::Identifier, Some("null"))? {
        return Ok(Expression::NullLiteral(token.value));
    }
    if let Some(token) = scanner.take(TokenKind::Identifier, Some("true"))? {
        return Ok(Expression::BooleanLiteral(token.value));
    }
    if let Some(token) = scanner.take(TokenKind::Identifier, Some("false"))? {
        return Ok(Expression::BooleanLiteral(token.value));
    }

    parse_function_expression(scanner, alias_path_parsing).map(Expression::Function)
}

fn expect(
    scanner: &mut ExpressionScanner,
    kind: TokenKind,
) -> Result<ExpressionToken, ExpressionError> {
    scanner
        .take(kind, None)?
        .ok_or(ExpressionError::Parser(ErrorCode::UnrecognizedExpression))
}

fn parse_function_expression(
    scanner: &mut ExpressionScanner,
    alias_path_parsing: bool,
) -> Result<FunctionExpression, ExpressionError> {
    let name_token = expect(scanner, TokenKind::Identifier)?;
    let start_position = name_token.start_position;
    let name = name_token.value;

    expect(scanner, TokenKind::LeftParenthesis)?;

    let mut arguments = Vec::new();
    let mut end_position = match scanner.take(TokenKind::RightParenthesis, None)? {
        Some(token) => token.end_position,
        None => {
            loop {
                arguments.push(parse_expression_inner(scanner, false)?);
                if scanner.take(TokenKind::Comma, None)?.is_none() {
                    break;
                }
            }
            expect(scanner, TokenKind::RightParenthesis)?.end_position
        }
    };

    let mut dereferences = Vec::new();
    loop {
        let is_safe = scanner.take(TokenKind::QuestionMark, None)?.is_some();

        if scanner.take(TokenKind::Dot, None)?.is_some() {
            let property = expect(scanner, TokenKind::Identifier)?;
            end_position = property.end_position;
            dereferences.push(Dereference {
                is_safe,
                is_dot_notation: false,
                expression: Expression::StringLiteral(property.value),
            });
            continue;
        }

        if scanner.take(TokenKind::LeftSquareBracket, None)?.is_some() {
            let index = parse_expression_inner(scanner, false)?;
            end_position = expect(scanner, TokenKind::RightSquareBracket)?.end_position;

            match index {
                Expression::StringLiteral(value) if alias_path_parsing => {
                    // Legacy alias paths: ['body/value'] expands to one
                    // string step per segment.
                    for part in value.split('/') {
                        dereferences.push(Dereference {
                            is_safe,
                            is_dot_notation: false,
                            expression: Expression::StringLiteral(part.to_owned()),
                        });
                    }
                }
                expression => dereferences.push(Dereference {
                    is_safe,
                    is_dot_notation: false,
                    expression,
                }),
            }
            continue;
        }

        // A safe-access marker must be followed by dot or bracket notation.
        if is_safe {
            return Err(ExpressionError::Parser(ErrorCode::UnrecognizedExpression));
        }
        break;
    }

    Ok(FunctionExpression {
        name,
        arguments,
        dereferences,
        expression: scanner.expression().to_owned(),
        start_position,
        end_position,
    })
}

fn parse_string_interpolation(
    chars: &[char],
    alias_path_parsing: bool,
) -> Result<Expression, ExpressionError> {
    let mut previous = 0;
    let mut current = 0;
    let mut segments = Vec::new();

    while current + 1 < chars.len() {
        if !(chars[current] == '@' && chars[current + 1] == '{') {
            current += 1;
            continue;
        }

        if previous < current {
            segments.push(Expression::StringLiteral(
                chars[previous..current].iter().collect(),
            ));
        }

        // `@@{` is an escaped `@`; the first `@` was flushed with the
        // literal run above, the second is skipped.
        if current > 0 && chars[current - 1] == '@' {
            current += 1;
            previous = current;
            continue;
        }

        let segment_start = current;
        let mut literal_region = false;
        let mut found = false;
        while current < chars.len() {
            if chars[current] == '\'' {
                literal_region = !literal_region;
            } else if !literal_region && chars[current] == '}' {
                found = true;
                break;
            }
            current += 1;
        }
        if !found {
            return Err(ExpressionError::Parser(
                ErrorCode::StringLiteralNotTerminated,
            ));
        }

        let inner: String = chars[segment_start + 2..current].iter().collect();
        segments.push(parse_expression(&inner, alias_path_parsing)?);
        current += 1;
        previous = current;
    }

    if previous < chars.len() {
        segments.push(Expression::StringLiteral(chars[previous..].iter().collect()));
    }

    Ok(Expression::StringInterpolation(segments))
}
