//! Defines the expression tree produced by the parser.

/// A parsed template expression.
///
/// Literal variants keep their textual representation; values are only
/// coerced when an expression is finally evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    NullLiteral(String),
    BooleanLiteral(String),
    NumberLiteral(String),
    StringLiteral(String),
    /// A call form `name(args...)` with optional dereference steps.
    Function(FunctionExpression),
    /// Literal text mixed with embedded `@{...}` expressions; segments
    /// concatenate in order to produce the resolved string.
    StringInterpolation(Vec<Expression>),
}

/// A function call together with the source text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub name: String,
    /// Arguments in evaluation order, left to right.
    pub arguments: Vec<Expression>,
    pub dereferences: Vec<Dereference>,
    /// The expression string owning this call, kept for re-slicing.
    pub expression: String,
    /// Half-open char offsets of the call within [`Self::expression`].
    /// A token's span starts where the previous token ended, so leading
    /// whitespace is part of the span.
    pub start_position: usize,
    pub end_position: usize,
}

impl FunctionExpression {
    /// The exact source text of this call, without any surrounding `@` or
    /// `@{`/`}` wrapper.
    pub fn source_text(&self) -> String {
        self.expression
            .chars()
            .skip(self.start_position)
            .take(self.end_position - self.start_position)
            .collect()
    }
}

/// One `.prop` or `[expr]` access step following a function call.
///
/// Dot steps are recorded as string-literal steps, so `is_dot_notation`
/// stays `false` for both notations; the field is part of the tree shape
/// consumed by downstream token renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Dereference {
    /// Marks a null-safe `?.` / `?[` access.
    pub is_safe: bool,
    pub is_dot_notation: bool,
    pub expression: Expression,
}
