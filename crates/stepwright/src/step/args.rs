//! Typed step arguments.

use crate::result::{StepwrightError, StepwrightResult};

/// One converted capture
#[derive(Debug, Clone, PartialEq)]
pub enum StepArg {
    Str(String),
    Int(i64),
    Float(f64),
    List(Vec<String>),
}

impl StepArg {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::List(_) => "listOfString",
        }
    }
}

/// Arguments of a matched step, in expression order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepArgs {
    args: Vec<StepArg>,
}

impl StepArgs {
    #[must_use]
    pub const fn new(args: Vec<StepArg>) -> Self {
        Self { args }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Raw argument
    pub fn get(&self, index: usize) -> StepwrightResult<&StepArg> {
        self.args.get(index).ok_or_else(|| StepwrightError::StepArgument {
            index,
            message: format!("step has only {} argument(s)", self.args.len()),
        })
    }

    fn mismatch(&self, index: usize, expected: &str) -> StepwrightError {
        let actual = self.args.get(index).map_or("nothing", StepArg::kind);
        StepwrightError::StepArgument {
            index,
            message: format!("expected {expected}, got {actual}"),
        }
    }

    /// String argument
    pub fn str(&self, index: usize) -> StepwrightResult<&str> {
        match self.get(index)? {
            StepArg::Str(s) => Ok(s),
            _ => Err(self.mismatch(index, "string")),
        }
    }

    /// Integer argument
    pub fn int(&self, index: usize) -> StepwrightResult<i64> {
        match self.get(index)? {
            StepArg::Int(n) => Ok(*n),
            _ => Err(self.mismatch(index, "int")),
        }
    }

    /// Non-negative integer argument, for indices and counts
    pub fn index(&self, index: usize) -> StepwrightResult<usize> {
        let n = self.int(index)?;
        usize::try_from(n).map_err(|_| StepwrightError::StepArgument {
            index,
            message: format!("expected a non-negative number, got {n}"),
        })
    }

    /// Float argument; integers are widened
    pub fn float(&self, index: usize) -> StepwrightResult<f64> {
        match self.get(index)? {
            StepArg::Float(f) => Ok(*f),
            StepArg::Int(n) => Ok(*n as f64),
            _ => Err(self.mismatch(index, "float")),
        }
    }

    /// List argument
    pub fn list(&self, index: usize) -> StepwrightResult<&[String]> {
        match self.get(index)? {
            StepArg::List(items) => Ok(items),
            _ => Err(self.mismatch(index, "listOfString")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> StepArgs {
        StepArgs::new(vec![
            StepArg::Str("Save".to_string()),
            StepArg::Int(-1),
            StepArg::List(vec!["a".to_string()]),
        ])
    }

    #[test]
    fn test_typed_access() {
        let a = sample();
        assert_eq!(a.str(0).unwrap(), "Save");
        assert_eq!(a.int(1).unwrap(), -1);
        assert!((a.float(1).unwrap() + 1.0).abs() < f64::EPSILON);
        assert_eq!(a.list(2).unwrap(), ["a"]);
    }

    #[test]
    fn test_type_mismatch_names_kinds() {
        let err = sample().int(0).unwrap_err();
        assert!(err.to_string().contains("expected int, got string"));
    }

    #[test]
    fn test_negative_index_rejected() {
        assert!(sample().index(1).is_err());
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(sample().get(5), Err(StepwrightError::StepArgument { index: 5, .. })));
    }
}
