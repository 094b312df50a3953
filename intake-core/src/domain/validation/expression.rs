// intake-core/src/domain/validation/expression.rs
//
// Parsers for the textual rule expressions stored on ValidationRule.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::domain::entity::FieldValue;

/// Inclusive numeric interval written `min..max`, `min..` or `..max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

impl std::fmt::Display for NumericRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let min = self.min.map(|v| v.to_string()).unwrap_or_default();
        let max = self.max.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}..{}", min, max)
    }
}

impl FromStr for NumericRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once("..")
            .ok_or_else(|| format!("range '{}' must look like 'min..max'", s))?;

        let bound = |raw: &str| -> Result<Option<f64>, String> {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<f64>()
                .map(Some)
                .map_err(|_| format!("invalid range bound '{}'", raw))
        };

        let range = NumericRange {
            min: bound(lo)?,
            max: bound(hi)?,
        };
        if range.min.is_none() && range.max.is_none() {
            return Err(format!("range '{}' has no bounds", s));
        }
        if let (Some(min), Some(max)) = (range.min, range.max)
            && min > max
        {
            return Err(format!("range '{}' has min greater than max", s));
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" | "=" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            _ => Err(format!("unknown comparison operator '{}'", s)),
        }
    }
}

/// Cross-field comparison `<left_field> <op> <right_field>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub left: String,
    pub op: CompareOp,
    pub right: String,
}

impl Comparison {
    /// Numbers compare numerically, everything else by its string form
    /// (ISO dates therefore order correctly).
    pub fn holds(&self, left: &FieldValue, right: &FieldValue) -> bool {
        let ordering = match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => Some(left.to_string().cmp(&right.to_string())),
        };
        ordering.is_some_and(|o| self.op.accepts(o))
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [left, op, right] = parts.as_slice() else {
            return Err(format!(
                "consistency expression '{}' must look like '<field> <op> <field>'",
                s
            ));
        };
        Ok(Comparison {
            left: left.to_string(),
            op: op.parse()?,
            right: right.to_string(),
        })
    }
}

/// Comma separated list of permitted values for reference rules.
pub fn reference_set(expression: &str) -> Vec<&str> {
    expression
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
}
