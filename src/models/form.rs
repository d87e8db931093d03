use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

const AGE_RANGE: RangeInclusive<u32> = 0..=120;
const SYSTOLIC_RANGE: RangeInclusive<f64> = 50.0..=250.0;
const DIASTOLIC_RANGE: RangeInclusive<f64> = 30.0..=150.0;
const CHOLESTEROL_RANGE: RangeInclusive<f64> = 50.0..=400.0;

/// Structured patient-data form submitted to the form pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub age: u32,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub cholesterol: f64,
    pub family_history: bool,
}

/// A single field that fell outside its accepted range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in a form record, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormValidationError {
    pub violations: Vec<FieldViolation>,
}

impl fmt::Display for FormValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl std::error::Error for FormValidationError {}

impl FormRecord {
    /// Check every numeric field against its accepted range.
    ///
    /// Out-of-range values are reported, never clamped.
    pub fn validate(&self) -> Result<(), FormValidationError> {
        let mut violations = Vec::new();

        if !AGE_RANGE.contains(&self.age) {
            violations.push(FieldViolation {
                field: "age",
                message: format!(
                    "{} is outside {}..={}",
                    self.age,
                    AGE_RANGE.start(),
                    AGE_RANGE.end()
                ),
            });
        }
        check_range(&mut violations, "systolic_bp", self.systolic_bp, &SYSTOLIC_RANGE);
        check_range(&mut violations, "diastolic_bp", self.diastolic_bp, &DIASTOLIC_RANGE);
        check_range(&mut violations, "cholesterol", self.cholesterol, &CHOLESTEROL_RANGE);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(FormValidationError { violations })
        }
    }
}

fn check_range(
    violations: &mut Vec<FieldViolation>,
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) {
    // NaN fails `contains`, so non-finite input is rejected here too
    if !range.contains(&value) {
        violations.push(FieldViolation {
            field,
            message: format!("{value} is outside {}..={}", range.start(), range.end()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FormRecord {
        FormRecord {
            age: 45,
            systolic_bp: 130.0,
            diastolic_bp: 85.0,
            cholesterol: 220.0,
            family_history: false,
        }
    }

    #[test]
    fn valid_record_passes() {
        assert!(record().validate().is_ok());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let edge = FormRecord {
            age: 120,
            systolic_bp: 50.0,
            diastolic_bp: 150.0,
            cholesterol: 400.0,
            family_history: true,
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn reports_every_violation_in_field_order() {
        let bad = FormRecord {
            age: 121,
            systolic_bp: 251.0,
            diastolic_bp: 29.0,
            cholesterol: 49.0,
            family_history: false,
        };
        let err = bad.validate().unwrap_err();
        let fields: Vec<&str> = err.violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["age", "systolic_bp", "diastolic_bp", "cholesterol"]);
    }

    #[test]
    fn nan_is_rejected() {
        let mut bad = record();
        bad.cholesterol = f64::NAN;
        let err = bad.validate().unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "cholesterol");
    }

    #[test]
    fn deserializes_from_api_payload() {
        let json = r#"{"age":45,"systolic_bp":130,"diastolic_bp":85,"cholesterol":220,"family_history":false}"#;
        let parsed: FormRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn display_joins_violations() {
        let mut bad = record();
        bad.age = 200;
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().starts_with("age: 200 is outside 0..=120"));
    }
}
