//! Template-expression scanning, parsing, and resolution for workflow
//! definitions.
//!
//! Workflow definitions embed a small expression language in their string
//! values (`@parameters('x')`, `@{concat('a','b')}`). This crate tokenizes
//! and parses those strings into an [`Expression`] tree and resolves
//! `parameters(...)` / `appsetting(...)` references against a
//! caller-supplied context, substituting values throughout an arbitrary
//! JSON value tree. Functions outside those two pass through verbatim for
//! a later evaluation stage.

pub mod ast;
pub mod engine;
pub mod error;
pub mod parser;
pub mod scanner;

// --- Public API ---
pub use ast::{Dereference, Expression, FunctionExpression};
pub use engine::{
    ExpressionEvaluationContext, ResolutionService, is_parameter_or_appsetting_expression,
};
pub use error::{ErrorCode, ExpressionError};
pub use parser::{is_template_expression, parse_expression, parse_template_expression};
pub use scanner::{ExpressionScanner, ExpressionToken, MAX_EXPRESSION_LENGTH, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn resolver(parameters: Value, appsettings: Value) -> ResolutionService {
        let to_map = |value: Value| -> HashMap<String, Value> {
            match value {
                Value::Object(members) => members.into_iter().collect(),
                _ => HashMap::new(),
            }
        };
        ResolutionService::new(to_map(parameters), to_map(appsettings))
    }

    #[test]
    fn test_plain_strings_pass_through() {
        let input = json!({ "x": "no expressions here" });
        assert!(!is_template_expression("no expressions here"));
        let resolved = resolver(json!({ "a": 1 }), json!({})).resolve(&input).unwrap();
        assert_eq!(resolved, input);
    }

    #[test]
    fn test_parse_and_resolve_parameter() {
        let parsed = parse_template_expression("@parameters('a')", false).unwrap();
        assert!(matches!(parsed, Expression::Function(_)));

        let resolved = resolver(json!({ "a": 5 }), json!({}))
            .resolve(&json!("@parameters('a')"))
            .unwrap();
        assert_eq!(resolved, json!(5));
    }

    #[test]
    fn test_resolve_workflow_document() {
        let workflow = json!({
            "definition": {
                "actions": {
                    "http": {
                        "inputs": {
                            "uri": "@{appsetting('baseUrl')}/items",
                            "retries": "@parameters('retryCount')",
                            "headers": { "x-ms-client": "@foo('x')" },
                        }
                    }
                }
            }
        });
        let resolved = resolver(
            json!({ "retryCount": { "type": "Int", "value": 4 } }),
            json!({ "baseUrl": "https://contoso.example" }),
        )
        .resolve(&workflow)
        .unwrap();
        assert_eq!(
            resolved,
            json!({
                "definition": {
                    "actions": {
                        "http": {
                            "inputs": {
                                "uri": "https://contoso.example/items",
                                "retries": 4,
                                "headers": { "x-ms-client": "@foo('x')" },
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_parse_dereference_shape() {
        let parsed = parse_expression("foo().bar[0]", false).unwrap();
        let Expression::Function(function) = parsed else {
            panic!("expected a function expression");
        };
        assert_eq!(function.name, "foo");
        assert_eq!(
            function.dereferences[0].expression,
            Expression::StringLiteral("bar".to_owned())
        );
        assert!(!function.dereferences[0].is_dot_notation);
        assert_eq!(
            function.dereferences[1].expression,
            Expression::NumberLiteral("0".to_owned())
        );
    }

    #[test]
    fn test_errors_carry_layer_and_code() {
        let err = parse_template_expression("not-an-expression", false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnrecognizedExpression);
        assert_eq!(err.category(), "Workflow.ExpressionParserException");

        let err = ExpressionScanner::new(&"a".repeat(MAX_EXPRESSION_LENGTH + 1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LimitExceeded);
        assert_eq!(err.category(), "Workflow.ExpressionScannerException");
    }
}
