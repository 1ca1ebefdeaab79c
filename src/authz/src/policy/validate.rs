//! Structural validation for policy documents
//!
//! Validation collects every problem it finds instead of stopping at the
//! first one, so policy authors can fix a document in a single pass.

use super::{PatternList, PolicyDocument};
use crate::condition::ConditionOperator;
use crate::error::{AuthzError, Result};
use serde_json::Value;

/// Validate raw JSON before it is converted into a [`PolicyDocument`]
///
/// Checks the `Statement` array, `Effect` values, non-empty `Action` and
/// `Resource` entries, and condition block shape and operator names.
pub fn validate_value(value: &Value) -> Result<()> {
    let mut problems = Vec::new();

    let Some(root) = value.as_object() else {
        return Err(AuthzError::validation("policy document must be a JSON object"));
    };

    if let Some(version) = root.get("Version") {
        if !version.is_string() {
            problems.push("Version: must be a string".to_string());
        }
    }

    match root.get("Statement") {
        None => problems.push("Statement: missing".to_string()),
        Some(Value::Array(statements)) => {
            for (idx, statement) in statements.iter().enumerate() {
                check_statement_value(idx, statement, &mut problems);
            }
        }
        Some(_) => problems.push("Statement: must be an array".to_string()),
    }

    finish(problems)
}

/// Validate an already-typed document
///
/// Catches what the type system allows but evaluation must not see: empty
/// pattern lists, empty patterns and unknown condition operators.
pub fn validate_document(document: &PolicyDocument) -> Result<()> {
    let mut problems = Vec::new();

    for (idx, statement) in document.statements.iter().enumerate() {
        check_patterns(idx, "Action", &statement.actions, &mut problems);
        check_patterns(idx, "Resource", &statement.resources, &mut problems);
        if let Some(condition) = &statement.condition {
            check_operator_names(idx, condition.operator_names(), &mut problems);
        }
    }

    finish(problems)
}

fn finish(problems: Vec<String>) -> Result<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AuthzError::Validation { problems })
    }
}

fn check_statement_value(idx: usize, statement: &Value, problems: &mut Vec<String>) {
    let Some(statement) = statement.as_object() else {
        problems.push(format!("Statement[{}]: must be an object", idx));
        return;
    };

    if let Some(sid) = statement.get("Sid") {
        if !sid.is_string() {
            problems.push(format!("Statement[{}].Sid: must be a string", idx));
        }
    }

    match statement.get("Effect") {
        None => problems.push(format!("Statement[{}].Effect: missing", idx)),
        Some(Value::String(effect)) if effect == "Allow" || effect == "Deny" => {}
        Some(other) => problems.push(format!(
            "Statement[{}].Effect: must be \"Allow\" or \"Deny\", got {}",
            idx, other
        )),
    }

    for field in ["Action", "Resource"] {
        check_pattern_value(idx, field, statement.get(field), problems);
    }

    if let Some(condition) = statement.get("Condition") {
        check_condition_value(idx, condition, problems);
    }
}

fn check_pattern_value(idx: usize, field: &str, value: Option<&Value>, problems: &mut Vec<String>) {
    match value {
        None => problems.push(format!("Statement[{}].{}: missing", idx, field)),
        Some(Value::String(pattern)) => {
            if pattern.is_empty() {
                problems.push(format!("Statement[{}].{}: must not be empty", idx, field));
            }
        }
        Some(Value::Array(patterns)) => {
            if patterns.is_empty() {
                problems.push(format!("Statement[{}].{}: must not be empty", idx, field));
            }
            for (pos, pattern) in patterns.iter().enumerate() {
                match pattern.as_str() {
                    Some("") => problems.push(format!("Statement[{}].{}[{}]: must not be empty", idx, field, pos)),
                    Some(_) => {}
                    None => problems.push(format!("Statement[{}].{}[{}]: must be a string", idx, field, pos)),
                }
            }
        }
        Some(_) => problems.push(format!(
            "Statement[{}].{}: must be a string or an array of strings",
            idx, field
        )),
    }
}

fn check_condition_value(idx: usize, condition: &Value, problems: &mut Vec<String>) {
    let Some(operators) = condition.as_object() else {
        problems.push(format!("Statement[{}].Condition: must be an object", idx));
        return;
    };

    check_operator_names(idx, operators.keys().map(String::as_str), problems);

    for (name, entries) in operators {
        if !entries.is_object() {
            problems.push(format!(
                "Statement[{}].Condition.{}: must be an object of context paths",
                idx, name
            ));
        }
    }
}

fn check_patterns(idx: usize, field: &str, patterns: &PatternList, problems: &mut Vec<String>) {
    if patterns.is_empty() {
        problems.push(format!("Statement[{}].{}: must not be empty", idx, field));
    }
    if patterns.iter().any(String::is_empty) {
        problems.push(format!("Statement[{}].{}: contains an empty pattern", idx, field));
    }
}

fn check_operator_names<'a>(idx: usize, names: impl Iterator<Item = &'a str>, problems: &mut Vec<String>) {
    for name in names {
        if name.parse::<ConditionOperator>().is_err() {
            problems.push(format!("Statement[{}].Condition: unknown operator \"{}\"", idx, name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Statement;
    use serde_json::json;

    fn problems_of(result: Result<()>) -> Vec<String> {
        match result {
            Err(AuthzError::Validation { problems }) => problems,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_document_passes() {
        let value = json!({
            "Version": "1",
            "Statement": [
                {"Sid": "s1", "Effect": "Allow", "Action": "a:*", "Resource": ["r/*"],
                 "Condition": {"StringEquals": {"principal.id": "u"}}}
            ]
        });
        assert!(validate_value(&value).is_ok());
    }

    #[test]
    fn test_empty_statement_array_is_valid() {
        assert!(validate_value(&json!({"Statement": []})).is_ok());
    }

    #[test]
    fn test_missing_statement() {
        let problems = problems_of(validate_value(&json!({"Version": "1"})));
        assert_eq!(problems, vec!["Statement: missing".to_string()]);

        let problems = problems_of(validate_value(&json!({"Statement": {"Effect": "Allow"}})));
        assert_eq!(problems, vec!["Statement: must be an array".to_string()]);

        let problems = problems_of(validate_value(&json!([1, 2])));
        assert_eq!(problems, vec!["policy document must be a JSON object".to_string()]);
    }

    #[test]
    fn test_collects_every_problem() {
        let value = json!({
            "Version": 2,
            "Statement": [
                {"Effect": "allow", "Action": [], "Resource": ""},
                {"Action": ["ok", 5], "Resource": "r", "Condition": {"Nope": {"a": 1}, "Bool": 3}},
                "not-an-object"
            ]
        });

        let problems = problems_of(validate_value(&value));
        assert_eq!(
            problems,
            vec![
                "Version: must be a string".to_string(),
                "Statement[0].Effect: must be \"Allow\" or \"Deny\", got \"allow\"".to_string(),
                "Statement[0].Action: must not be empty".to_string(),
                "Statement[0].Resource: must not be empty".to_string(),
                "Statement[1].Effect: missing".to_string(),
                "Statement[1].Action[1]: must be a string".to_string(),
                "Statement[1].Condition: unknown operator \"Nope\"".to_string(),
                "Statement[1].Condition.Bool: must be an object of context paths".to_string(),
                "Statement[2]: must be an object".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_typed_document() {
        let doc = PolicyDocument::new()
            .with_statement(Statement::allow(Vec::<String>::new(), "r"))
            .with_statement(Statement::deny("a", vec!["r", ""]));

        let problems = problems_of(validate_document(&doc));
        assert_eq!(
            problems,
            vec![
                "Statement[0].Action: must not be empty".to_string(),
                "Statement[1].Resource: contains an empty pattern".to_string(),
            ]
        );
    }

    #[test]
    fn test_typed_document_unknown_operator() {
        let doc: PolicyDocument = serde_json::from_value(json!({
            "Statement": [{"Effect": "Allow", "Action": "a", "Resource": "r",
                           "Condition": {"StringEqualz": {"principal.id": "u"}}}]
        }))
        .unwrap();

        let problems = problems_of(validate_document(&doc));
        assert_eq!(problems, vec!["Statement[0].Condition: unknown operator \"StringEqualz\"".to_string()]);
    }
}
