//! Argument validation against a [`ToolSpec`]
//!
//! Model-supplied arguments are checked and coerced before a tool runs, so a
//! tool body only ever sees the parameters it declared, with the declared
//! types and defaults applied.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::spec::{ParamKind, ParamSpec, ToolSpec};
use super::ToolError;

/// Why a set of arguments could not be bound to a tool's parameters
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArgumentError {
    #[error("missing required argument '{0}'")]
    Missing(String),

    #[error("unexpected argument(s): {}", .0.join(", "))]
    Unexpected(Vec<String>),

    #[error("argument '{name}' must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("argument '{name}' must be one of [{}], got '{value}'", .allowed.join(", "))]
    NotAllowed {
        name: String,
        value: String,
        allowed: Vec<String>,
    },
}

/// Arguments that passed validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// A string argument the tool declares as required or defaulted
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.get_str(name)
            .ok_or_else(|| ToolError::Failed(format!("argument '{}' is not set", name)))
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Validate and coerce `arguments` against `spec`
pub fn validate(
    spec: &ToolSpec,
    arguments: &Map<String, Value>,
) -> Result<ToolArgs, ArgumentError> {
    let mut unexpected: Vec<String> = arguments
        .keys()
        .filter(|key| spec.find_param(key).is_none())
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        unexpected.sort();
        return Err(ArgumentError::Unexpected(unexpected));
    }

    let mut values = Map::new();
    for param in &spec.params {
        let supplied = arguments.get(&param.name).filter(|v| !v.is_null());

        let value = match (supplied, &param.default) {
            (Some(value), _) => coerce(param, value)?,
            (None, Some(default)) => default.clone(),
            (None, None) if param.required => {
                return Err(ArgumentError::Missing(param.name.clone()))
            }
            (None, None) => continue,
        };

        check_allowed(param, &value)?;
        values.insert(param.name.clone(), value);
    }

    Ok(ToolArgs { values })
}

fn coerce(param: &ParamSpec, value: &Value) -> Result<Value, ArgumentError> {
    let coerced = match (param.kind, value) {
        (ParamKind::String, Value::String(_)) => Some(value.clone()),
        // Codes like 600519 often arrive as numbers
        (ParamKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
        (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
        (ParamKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };

    coerced.ok_or_else(|| ArgumentError::WrongType {
        name: param.name.clone(),
        expected: param.kind.as_str(),
        found: describe(value),
    })
}

fn check_allowed(param: &ParamSpec, value: &Value) -> Result<(), ArgumentError> {
    if param.allowed.is_empty() {
        return Ok(());
    }

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if param.allowed.iter().any(|a| *a == text) {
        return Ok(());
    }

    Err(ArgumentError::NotAllowed {
        name: param.name.clone(),
        value: text,
        allowed: param.allowed.clone(),
    })
}

fn describe(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() > 40 {
        format!("{}...", rendered.chars().take(40).collect::<String>())
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market_spec() -> ToolSpec {
        ToolSpec::new("get_stock_zh_a_spot_data", "bars")
            .param(ParamSpec::string("symbol", "code").required())
            .param(
                ParamSpec::string("period", "bar size")
                    .one_of(&["daily", "weekly", "monthly"])
                    .default_value(json!("daily")),
            )
            .param(ParamSpec::string("start_date", "YYYYMMDD"))
            .param(ParamSpec::integer("limit", "rows"))
            .param(ParamSpec::boolean("adjust", "forward adjust"))
            .param(ParamSpec::number("min_close", "price floor"))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let validated = validate(&market_spec(), &args(json!({"symbol": "600519"}))).unwrap();
        assert_eq!(validated.get_str("symbol"), Some("600519"));
        assert_eq!(validated.get_str("period"), Some("daily"));
        assert!(validated.get("start_date").is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = validate(&market_spec(), &Map::new()).unwrap_err();
        assert_eq!(err, ArgumentError::Missing("symbol".to_string()));
        assert_eq!(err.to_string(), "missing required argument 'symbol'");
    }

    #[test]
    fn test_unexpected_arguments() {
        let err = validate(
            &market_spec(),
            &args(json!({"symbol": "1", "ticker": "2", "data_table_name": "t"})),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ArgumentError::Unexpected(vec!["data_table_name".to_string(), "ticker".to_string()])
        );
    }

    #[test]
    fn test_coercions() {
        let validated = validate(
            &market_spec(),
            &args(json!({"symbol": 600519, "limit": "30", "adjust": "TRUE", "min_close": " 12.5"})),
        )
        .unwrap();
        assert_eq!(validated.get_str("symbol"), Some("600519"));
        assert_eq!(validated.get_i64("limit"), Some(30));
        assert_eq!(validated.get_bool("adjust"), Some(true));
        assert_eq!(validated.get_f64("min_close"), Some(12.5));

        let err = validate(&market_spec(), &args(json!({"symbol": "1", "min_close": "cheap"})))
            .unwrap_err();
        assert!(err.to_string().contains("must be number"));
    }

    #[test]
    fn test_wrong_type() {
        let err = validate(&market_spec(), &args(json!({"symbol": ["600519"]}))).unwrap_err();
        assert!(matches!(err, ArgumentError::WrongType { ref name, .. } if name == "symbol"));

        let err =
            validate(&market_spec(), &args(json!({"symbol": "1", "limit": 2.5}))).unwrap_err();
        assert!(err.to_string().contains("must be integer"));
    }

    #[test]
    fn test_enum_enforced() {
        let err = validate(&market_spec(), &args(json!({"symbol": "1", "period": "hourly"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument 'period' must be one of [daily, weekly, monthly], got 'hourly'"
        );
    }

    #[test]
    fn test_null_treated_as_absent() {
        let validated =
            validate(&market_spec(), &args(json!({"symbol": "1", "period": null}))).unwrap();
        assert_eq!(validated.get_str("period"), Some("daily"));
    }
}
