//! A hand-written tokenizer for the expression language, exposing the
//! single-token lookahead interface the parser drives.

use crate::error::{ErrorCode, ExpressionError};

/// Maximum expression length in chars; longer inputs are rejected at
/// construction.
pub const MAX_EXPRESSION_LENGTH: usize = 8192;

/// The kind of an [`ExpressionToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Dot,
    Comma,
    LeftParenthesis,
    RightParenthesis,
    LeftSquareBracket,
    RightSquareBracket,
    QuestionMark,
    StringLiteral,
    IntegerLiteral,
    FloatLiteral,
    Identifier,
    EndOfData,
}

/// One scanned token with its half-open char span. The span starts where
/// the previous token ended, so leading whitespace is included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionToken {
    pub kind: TokenKind,
    pub value: String,
    pub start_position: usize,
    pub end_position: usize,
}

/// Case-insensitive comparison using full Unicode lowercase folding, used
/// for function names, boolean/null literals, and token values alike.
pub(crate) fn equals_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// The fixed whitespace set of the language (the `char.IsWhiteSpace` list),
/// not the full Unicode `White_Space` property.
fn is_expression_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\u{0020}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{0009}'..='\u{000d}'
            | '\u{0085}'
            | '\u{00a0}'
    )
}

/// Identifier characters are anything outside the reserved set and the
/// whitespace set.
fn is_identifier_char(ch: char) -> bool {
    !matches!(
        ch,
        '.' | ',' | '(' | ')' | '{' | '}' | '@' | '[' | ']' | '?' | '\''
    ) && !is_expression_whitespace(ch)
}

/// Tokenizes one expression string.
///
/// The scanner holds one token of lookahead; [`ExpressionScanner::take`] is
/// the sole primitive the parser uses, so there is no backtracking beyond
/// that token. Scan errors surface lazily, when the offending token is
/// first read.
#[derive(Debug)]
pub struct ExpressionScanner {
    expression: String,
    chars: Vec<char>,
    start_position: usize,
    current: ExpressionToken,
}

impl ExpressionScanner {
    pub fn new(expression: &str) -> Result<Self, ExpressionError> {
        let chars: Vec<char> = expression.chars().collect();
        if chars.len() > MAX_EXPRESSION_LENGTH {
            return Err(ExpressionError::Scanner(ErrorCode::LimitExceeded));
        }

        let mut scanner = Self {
            expression: expression.to_owned(),
            chars,
            start_position: 0,
            current: ExpressionToken {
                kind: TokenKind::EndOfData,
                value: String::new(),
                start_position: 0,
                end_position: 0,
            },
        };
        scanner.current = scanner.read_next_token()?;
        Ok(scanner)
    }

    /// The expression string being scanned.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the current token and advances if its kind matches and, when
    /// `value` is given, its value matches case-insensitively. Otherwise the
    /// stream is left untouched and `None` is returned.
    pub fn take(
        &mut self,
        kind: TokenKind,
        value: Option<&str>,
    ) -> Result<Option<ExpressionToken>, ExpressionError> {
        if self.current.kind == kind
            && value.is_none_or(|v| equals_ignore_case(v, &self.current.value))
        {
            let next = self.read_next_token()?;
            return Ok(Some(std::mem::replace(&mut self.current, next)));
        }
        Ok(None)
    }

    /// Unconditionally advances and returns the new current token.
    pub fn next_token(&mut self) -> Result<ExpressionToken, ExpressionError> {
        self.current = self.read_next_token()?;
        Ok(self.current.clone())
    }

    fn read_next_token(&mut self) -> Result<ExpressionToken, ExpressionError> {
        let initial_start = self.start_position;
        let mut pos = initial_start;
        while pos < self.chars.len() && is_expression_whitespace(self.chars[pos]) {
            pos += 1;
        }

        if pos >= self.chars.len() {
            // Synthetic token; requesting tokens past it keeps yielding it.
            self.start_position = pos + 1;
            return Ok(ExpressionToken {
                kind: TokenKind::EndOfData,
                value: String::new(),
                start_position: initial_start,
                end_position: self.start_position,
            });
        }

        if let Some(token) = self.punctuation_token(pos) {
            return Ok(token);
        }

        match self.chars[pos] {
            '\'' => self.string_literal_token(pos),
            ch if ch == '+' || ch == '-' || ch.is_ascii_digit() => self.number_token(pos),
            ch if is_identifier_char(ch) => {
                let token = self.identifier_token(pos);
                if token.value.starts_with('"') && token.value.ends_with('"') {
                    return Err(ExpressionError::Scanner(ErrorCode::MisusedDoubleQuotes));
                }
                Ok(token)
            }
            _ => Err(ExpressionError::Scanner(ErrorCode::UnexpectedCharacter)),
        }
    }

    fn punctuation_token(&mut self, pos: usize) -> Option<ExpressionToken> {
        let kind = match self.chars[pos] {
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LeftParenthesis,
            ')' => TokenKind::RightParenthesis,
            '[' => TokenKind::LeftSquareBracket,
            ']' => TokenKind::RightSquareBracket,
            '?' => TokenKind::QuestionMark,
            _ => return None,
        };

        let token = ExpressionToken {
            kind,
            value: self.chars[pos].to_string(),
            start_position: self.start_position,
            end_position: pos + 1,
        };
        self.start_position = pos + 1;
        Some(token)
    }

    fn number_token(&mut self, start: usize) -> Result<ExpressionToken, ExpressionError> {
        let initial_start = self.start_position;
        let mut pos = start;
        if matches!(self.chars[pos], '+' | '-') {
            pos += 1;
        }

        let mut is_float = false;
        pos = self.scan_while(pos, |c| c.is_ascii_digit());

        if pos < self.chars.len() && self.chars[pos] == '.' {
            is_float = true;
            pos = self.scan_while(pos + 1, |c| c.is_ascii_digit());
        }

        if pos < self.chars.len() && matches!(self.chars[pos], 'e' | 'E') {
            is_float = true;
            pos += 1;
            if pos < self.chars.len() && matches!(self.chars[pos], '+' | '-') {
                pos += 1;
            }
            pos = self.scan_while(pos, |c| c.is_ascii_digit());
        }

        // A number directly followed by an identifier character has no
        // separator between two tokens.
        if pos < self.chars.len() && is_identifier_char(self.chars[pos]) {
            return Err(ExpressionError::Scanner(ErrorCode::UnexpectedCharacter));
        }

        let value: String = self.chars[start..pos].iter().collect();
        self.start_position = pos;
        Ok(ExpressionToken {
            kind: if is_float {
                TokenKind::FloatLiteral
            } else {
                TokenKind::IntegerLiteral
            },
            value,
            start_position: initial_start,
            end_position: pos,
        })
    }

    fn identifier_token(&mut self, start: usize) -> ExpressionToken {
        let initial_start = self.start_position;
        let end = self.scan_while(start, is_identifier_char);
        let value: String = self.chars[start..end].iter().collect();
        self.start_position = end;
        ExpressionToken {
            kind: TokenKind::Identifier,
            value,
            start_position: initial_start,
            end_position: end,
        }
    }

    fn string_literal_token(&mut self, start: usize) -> Result<ExpressionToken, ExpressionError> {
        let mut pos = start;
        loop {
            pos = self.scan_while(pos + 1, |c| c != '\'');
            // A doubled quote is an escaped literal quote, keep scanning.
            if pos + 1 < self.chars.len() && self.chars[pos + 1] == '\'' {
                pos += 1;
            } else {
                break;
            }
        }

        if pos >= self.chars.len() {
            return Err(ExpressionError::Scanner(
                ErrorCode::StringLiteralNotTerminated,
            ));
        }

        let value = self.chars[start + 1..pos]
            .iter()
            .collect::<String>()
            .replace("''", "'");
        let token = ExpressionToken {
            kind: TokenKind::StringLiteral,
            value,
            start_position: self.start_position,
            end_position: pos + 1,
        };
        self.start_position = pos + 1;
        Ok(token)
    }

    fn scan_while<F>(&self, mut pos: usize, predicate: F) -> usize
    where
        F: Fn(char) -> bool,
    {
        while pos < self.chars.len() && predicate(self.chars[pos]) {
            pos += 1;
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_tokens(expression: &str) -> Vec<ExpressionToken> {
        let mut scanner = ExpressionScanner::new(expression).unwrap();
        let mut tokens = Vec::new();
        loop {
            let kind = scanner.current.kind;
            let token = scanner
                .take(kind, None)
                .unwrap()
                .expect("current token always matches its own kind");
            let done = token.kind == TokenKind::EndOfData;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn tokenizes_function_call() {
        let kinds: Vec<TokenKind> = collect_tokens("parameters('x')")
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::LeftParenthesis,
                TokenKind::StringLiteral,
                TokenKind::RightParenthesis,
                TokenKind::EndOfData,
            ]
        );
    }

    #[test]
    fn token_spans_are_half_open_and_include_leading_whitespace() {
        let tokens = collect_tokens("  foo (");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "foo");
        assert_eq!((tokens[0].start_position, tokens[0].end_position), (0, 5));
        assert_eq!(tokens[1].kind, TokenKind::LeftParenthesis);
        assert_eq!((tokens[1].start_position, tokens[1].end_position), (5, 7));
    }

    #[test]
    fn doubled_quote_escapes_inside_string_literal() {
        let tokens = collect_tokens("'a''b'");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].value, "a'b");
        assert_eq!(tokens[0].end_position, 6);
    }

    #[test]
    fn unterminated_string_literal_is_rejected() {
        let err = ExpressionScanner::new("'abc").unwrap_err();
        assert_eq!(
            err,
            ExpressionError::Scanner(ErrorCode::StringLiteralNotTerminated)
        );
    }

    #[test]
    fn classifies_numbers() {
        assert_eq!(collect_tokens("42")[0].kind, TokenKind::IntegerLiteral);
        assert_eq!(collect_tokens("+10")[0].value, "+10");
        assert_eq!(collect_tokens("-3")[0].kind, TokenKind::IntegerLiteral);
        assert_eq!(collect_tokens("1.5")[0].kind, TokenKind::FloatLiteral);
        assert_eq!(collect_tokens("2e10")[0].kind, TokenKind::FloatLiteral);
        assert_eq!(collect_tokens("1.5E-3")[0].kind, TokenKind::FloatLiteral);
        assert_eq!(collect_tokens("1.5E-3")[0].value, "1.5E-3");
    }

    #[test]
    fn number_adjacent_to_identifier_is_rejected() {
        let err = ExpressionScanner::new("1x").unwrap_err();
        assert_eq!(err, ExpressionError::Scanner(ErrorCode::UnexpectedCharacter));
    }

    #[test]
    fn double_quoted_identifier_is_rejected() {
        let err = ExpressionScanner::new("\"foo\"").unwrap_err();
        assert_eq!(
            err,
            ExpressionError::Scanner(ErrorCode::MisusedDoubleQuotes)
        );
    }

    #[test]
    fn expression_over_limit_is_rejected() {
        let expression = "a".repeat(MAX_EXPRESSION_LENGTH + 1);
        let err = ExpressionScanner::new(&expression).unwrap_err();
        assert_eq!(err, ExpressionError::Scanner(ErrorCode::LimitExceeded));
    }

    #[test]
    fn end_of_data_repeats() {
        let mut scanner = ExpressionScanner::new("").unwrap();
        for _ in 0..3 {
            let token = scanner.take(TokenKind::EndOfData, None).unwrap().unwrap();
            assert_eq!(token.kind, TokenKind::EndOfData);
        }
    }

    #[test]
    fn take_matches_value_case_insensitively() {
        let mut scanner = ExpressionScanner::new("NULL").unwrap();
        assert!(
            scanner
                .take(TokenKind::Identifier, Some("null"))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn take_leaves_stream_untouched_on_mismatch() {
        let mut scanner = ExpressionScanner::new("foo").unwrap();
        assert!(scanner.take(TokenKind::Comma, None).unwrap().is_none());
        assert!(
            scanner
                .take(TokenKind::Identifier, Some("bar"))
                .unwrap()
                .is_none()
        );
        let token = scanner.take(TokenKind::Identifier, None).unwrap().unwrap();
        assert_eq!(token.value, "foo");
    }

    #[test]
    fn scan_error_surfaces_when_the_bad_token_is_reached() {
        // The leading identifier scans fine; the unterminated literal after
        // it fails only once the scanner advances onto it.
        let mut scanner = ExpressionScanner::new("foo 'bar").unwrap();
        let err = scanner.take(TokenKind::Identifier, None).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::Scanner(ErrorCode::StringLiteralNotTerminated)
        );
    }
}
