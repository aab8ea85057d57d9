//! Resolution of template-expression strings inside workflow value trees.
//!
//! The service walks an arbitrary JSON value tree, parses every string that
//! looks like a template expression, and evaluates `parameters(...)` and
//! `appsetting(...)` references against its context. Any other function
//! passes through verbatim for a later evaluation stage.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::ast::{Expression, FunctionExpression};
use crate::error::{ErrorCode, ExpressionError};
use crate::parser::{is_template_expression, parse_template_expression};
use crate::scanner::equals_ignore_case;

const PARAMETERS_FUNCTION: &str = "parameters";
const APPSETTING_FUNCTION: &str = "appsetting";

/// The immutable lookup context one resolution pass evaluates against.
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluationContext {
    pub parameters: HashMap<String, Value>,
    pub appsettings: HashMap<String, Value>,
}

/// Whether a function name is one of the two the resolver evaluates.
pub fn is_parameter_or_appsetting_expression(name: &str) -> bool {
    equals_ignore_case(name, PARAMETERS_FUNCTION) || equals_ignore_case(name, APPSETTING_FUNCTION)
}

/// Detects a "parameters object" wrapper `{ "type": .., "value": .. }` with
/// both members present and non-null.
fn is_parameters_object(value: &Value) -> bool {
    value.get("type").is_some_and(|member| !member.is_null())
        && value.get("value").is_some_and(|member| !member.is_null())
}

/// Deep-resolves template expressions in a value tree against a fixed
/// parameter/appsetting context.
pub struct ResolutionService {
    context: ExpressionEvaluationContext,
}

impl ResolutionService {
    /// Builds the context, unwrapping any parameter whose value is a
    /// parameters-object wrapper.
    pub fn new(parameters: HashMap<String, Value>, appsettings: HashMap<String, Value>) -> Self {
        let parameters = parameters
            .into_iter()
            .map(|(key, value)| {
                if is_parameters_object(&value) {
                    if let Value::Object(mut wrapper) = value {
                        let unwrapped = wrapper.remove("value").unwrap_or(Value::Null);
                        return (key, unwrapped);
                    }
                }
                (key, value)
            })
            .collect();

        Self {
            context: ExpressionEvaluationContext {
                parameters,
                appsettings,
            },
        }
    }

    /// Returns a copy of `root` with every template-expression string
    /// substituted. With an empty context the tree is returned as-is.
    pub fn resolve(&self, root: &Value) -> Result<Value, ExpressionError> {
        if self.context.parameters.is_empty() && self.context.appsettings.is_empty() {
            return Ok(root.clone());
        }
        self.resolve_value(root)
    }

    fn resolve_value(&self, root: &Value) -> Result<Value, ExpressionError> {
        match root {
            Value::Object(members) => {
                let mut resolved = Map::with_capacity(members.len());
                for (key, value) in members {
                    resolved.insert(key.clone(), self.resolve_value(value)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::String(text) => self.resolve_string(text),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, text: &str) -> Result<Value, ExpressionError> {
        if !is_template_expression(text) {
            return Ok(Value::String(text.to_owned()));
        }

        match parse_template_expression(text, false)? {
            Expression::StringInterpolation(segments) => {
                self.resolve_interpolation(&segments).map(Value::String)
            }
            Expression::Function(function) => self.resolve_function(&function),
            Expression::NullLiteral(value)
            | Expression::BooleanLiteral(value)
            | Expression::NumberLiteral(value)
            | Expression::StringLiteral(value) => Ok(Value::String(value)),
        }
    }

    fn resolve_interpolation(&self, segments: &[Expression]) -> Result<String, ExpressionError> {
        let mut resolved = String::new();
        for segment in segments {
            match segment {
                Expression::Function(function)
                    if is_parameter_or_appsetting_expression(&function.name) =>
                {
                    let value = self.evaluate(&format!("@{}", function.source_text()))?;
                    push_concatenated(&mut resolved, &value);
                }
                Expression::NullLiteral(value)
                | Expression::BooleanLiteral(value)
                | Expression::NumberLiteral(value)
                | Expression::StringLiteral(value) => resolved.push_str(value),
                _ => {}
            }
        }
        Ok(resolved)
    }

    fn resolve_function(&self, function: &FunctionExpression) -> Result<Value, ExpressionError> {
        let expression = format!("@{}", function.expression);
        if is_parameter_or_appsetting_expression(&function.name) {
            self.evaluate(&expression)
        } else {
            // Unrecognized functions are not errors at this layer; they are
            // re-emitted verbatim for a later evaluation stage.
            log::debug!("passing through unrecognized function '{}'", function.name);
            Ok(Value::String(expression))
        }
    }

    fn evaluate(&self, expression: &str) -> Result<Value, ExpressionError> {
        if expression.is_empty() {
            return Err(ExpressionError::Evaluation(ErrorCode::EmptyValue));
        }

        let parsed = parse_template_expression(expression, false)?;

        let mut segment = &parsed;
        let mut in_interpolation = false;
        if let Expression::StringInterpolation(segments) = &parsed {
            if segments.len() == 1 {
                segment = &segments[0];
                in_interpolation = true;
            }
        }

        if let Expression::Function(function) = segment {
            // A missing or null lookup is not an error; the original text
            // passes through unchanged.
            return Ok(match self.evaluate_function(function, in_interpolation) {
                Some(value) if !value.is_null() => value,
                _ => Value::String(expression.to_owned()),
            });
        }

        self.normalize_escapes(expression).map(Value::String)
    }

    /// Evaluates `parameters('name')` / `appsetting('name')` against the
    /// context. Exactly one argument is required: a string literal naming
    /// the entry, or a nested `parameters`/`appsetting` call whose result
    /// is taken directly. Any other shape yields no value, which the caller
    /// turns into raw-text passthrough.
    fn evaluate_function(
        &self,
        function: &FunctionExpression,
        in_interpolation: bool,
    ) -> Option<Value> {
        let is_parameters = equals_ignore_case(&function.name, PARAMETERS_FUNCTION);
        let is_appsetting = equals_ignore_case(&function.name, APPSETTING_FUNCTION);
        if !(is_parameters || is_appsetting) || function.arguments.len() != 1 {
            return None;
        }

        match &function.arguments[0] {
            Expression::StringLiteral(name) => {
                let result = if is_parameters {
                    self.context.parameters.get(name)
                } else {
                    self.context.appsettings.get(name)
                }
                .cloned()?;

                if in_interpolation {
                    // In single-segment interpolation position only an
                    // empty-string result is usable verbatim.
                    match result {
                        Value::String(text) if text.is_empty() => Some(Value::String(text)),
                        _ => None,
                    }
                } else {
                    Some(result)
                }
            }
            Expression::Function(nested) => self.evaluate_function(nested, false),
            _ => None,
        }
    }

    /// Escape normalization for expression strings the function path did
    /// not resolve: a leading `@@` loses one `@`, embedded `@@{` runs become
    /// `@{`; text that still looks like an expression after that could
    /// neither be resolved nor escaped.
    fn normalize_escapes(&self, expression: &str) -> Result<String, ExpressionError> {
        if expression.starts_with("@@") {
            return Ok(expression[1..].to_owned());
        }

        if expression.contains("@@{") {
            return Ok(expression.replace("@@{", "@{"));
        }

        if expression.starts_with('@') || expression.contains("@{") {
            return Err(ExpressionError::Evaluation(ErrorCode::UnrecognizedExpression));
        }

        Ok(expression.to_owned())
    }
}

fn push_concatenated(out: &mut String, value: &Value) {
    match value {
        Value::String(text) => out.push_str(text),
        other => out.push_str(&other.to_string()),
    }
}
