//! Pairs ordered parameter values with their type signature.

use tablekit_db::Value;

use crate::error::{TableError, TableResult};
use crate::schema::BroadType;

/// Parameter values ready to be attached to a prepared statement.
///
/// Values are owned copies, coerced toward the type named by their signature
/// code. Attaching them right before execution is equivalent to binding by
/// address since nothing can mutate them in between.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    signature: String,
    values: Vec<Value>,
}

impl BoundParameters {
    /// Type signature, one code per value.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Values in placeholder order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON rendering of the values, used in execution diagnostics.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.values).unwrap_or_else(|_| format!("{:?}", self.values))
    }
}

/// Binds `values` under `signature`.
///
/// # Errors
///
/// Returns [`TableError::SizeMismatch`] if the signature and value counts
/// differ, and [`TableError::Operation`] for an unknown signature code.
pub fn bind(signature: &str, values: Vec<Value>) -> TableResult<BoundParameters> {
    let codes = signature.chars().count();
    if codes != values.len() {
        return Err(TableError::SizeMismatch {
            expected: codes,
            actual: values.len(),
        });
    }
    let values = signature
        .chars()
        .zip(values)
        .map(|(code, value)| {
            BroadType::from_code(code)
                .map(|ty| coerce(ty, value))
                .ok_or_else(|| {
                    TableError::Operation(format!("unknown type signature code '{code}'"))
                })
        })
        .collect::<TableResult<Vec<_>>>()?;
    Ok(BoundParameters {
        signature: signature.to_string(),
        values,
    })
}

/// Largest magnitude below which every integer is exact as an `f64`.
const MAX_EXACT_F64_INT: u64 = 1 << f64::MANTISSA_DIGITS;

/// Lossless conversion toward `ty`. A value converts only when it reads back
/// as the same text or number, so `" 42"`, `"042"` and ciphertext in an
/// integer column are bound as they are.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn coerce(ty: BroadType, value: Value) -> Value {
    match (ty, value) {
        (BroadType::Int, Value::Text(text)) => match text.parse::<i64>() {
            Ok(v) if v.to_string() == text => Value::Integer(v),
            _ => Value::Text(text),
        },
        (BroadType::Int, Value::Real(v))
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 =>
        {
            Value::Integer(v as i64)
        }
        (BroadType::Double, Value::Integer(v)) if v.unsigned_abs() <= MAX_EXACT_F64_INT => {
            Value::Real(v as f64)
        }
        (BroadType::Double, Value::Text(text)) => match text.parse::<f64>() {
            Ok(v) if v.is_finite() && v.to_string() == text => Value::Real(v),
            _ => Value::Text(text),
        },
        (BroadType::String, Value::Integer(v)) => Value::Text(v.to_string()),
        (BroadType::String, Value::Real(v)) => Value::Text(v.to_string()),
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_keeps_order() {
        let bound = bind("is", vec![Value::from(5), Value::from("RIT")]).expect("bind");
        assert_eq!(bound.signature(), "is");
        assert_eq!(bound.values(), &[Value::Integer(5), Value::from("RIT")]);
    }

    #[test]
    fn test_bind_size_mismatch() {
        let err = bind("iss", vec![Value::from(1)]).expect_err("mismatch");
        assert!(matches!(
            err,
            TableError::SizeMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_bind_unknown_code() {
        let err = bind("x", vec![Value::Null]).expect_err("unknown code");
        assert!(matches!(err, TableError::Operation(_)));
    }

    #[test]
    fn test_coercion_is_lossless() {
        let bound = bind(
            "iidsssb",
            vec![
                Value::from("42"),
                Value::from("tk1:not-a-number"),
                Value::from(3),
                Value::from(7),
                Value::from(1.5),
                Value::Null,
                Value::from("raw"),
            ],
        )
        .expect("bind");
        assert_eq!(
            bound.values(),
            &[
                Value::Integer(42),
                Value::from("tk1:not-a-number"),
                Value::Real(3.0),
                Value::from("7"),
                Value::from("1.5"),
                Value::Null,
                Value::from("raw"),
            ]
        );
    }

    #[test]
    fn test_text_that_does_not_read_back_is_kept() {
        let bound = bind(
            "iiidd",
            vec![
                Value::from(" 42"),
                Value::from("042"),
                Value::from("+7"),
                Value::from("1.50"),
                Value::from("2.5"),
            ],
        )
        .expect("bind");
        assert_eq!(
            bound.values(),
            &[
                Value::from(" 42"),
                Value::from("042"),
                Value::from("+7"),
                Value::from("1.50"),
                Value::Real(2.5),
            ]
        );
    }

    #[test]
    fn test_large_integer_stays_integer_in_double_column() {
        let big = (1_i64 << 53) + 1;
        let bound = bind("dd", vec![Value::from(big), Value::from(1_i64 << 53)]).expect("bind");
        assert_eq!(
            bound.values(),
            &[Value::Integer(big), Value::Real(9_007_199_254_740_992.0)]
        );
    }

    #[test]
    fn test_fractional_real_stays_real_in_int_column() {
        let bound = bind("ii", vec![Value::Real(2.0), Value::Real(2.5)]).expect("bind");
        assert_eq!(bound.values(), &[Value::Integer(2), Value::Real(2.5)]);
    }

    #[test]
    fn test_to_json() {
        let bound = bind("is", vec![Value::from(0), Value::from("Bob")]).expect("bind");
        assert_eq!(bound.to_json(), r#"[0,"Bob"]"#);
    }
}
