//! Relation arity metadata and argument-list validation.

use std::fmt;

use crate::error::ArityError;

/// How many arguments a relation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityDescriptor {
    /// Exactly `n` arguments.
    Fixed(usize),
    /// Between `min` and `max` arguments inclusive. A bound that the knowledge
    /// base has not reported is `None` and does not constrain the count.
    Variable {
        /// Lower bound, if known.
        min: Option<usize>,
        /// Upper bound, if known.
        max: Option<usize>,
    },
    /// Nothing is known; any count is accepted.
    Unknown,
}

/// Something that may stand for an absent argument.
pub trait Nullable {
    /// Returns true if this argument is null.
    fn is_null(&self) -> bool;
}

impl<T> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

impl ArityDescriptor {
    /// Returns true if `count` arguments fit this descriptor.
    #[must_use]
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            ArityDescriptor::Fixed(n) => count == n,
            ArityDescriptor::Variable { min, max } => {
                min.map_or(true, |min| count >= min) && max.map_or(true, |max| count <= max)
            }
            ArityDescriptor::Unknown => true,
        }
    }

    /// Validates an argument list.
    ///
    /// The count is checked first. When `forbid_null_args` is set, every null
    /// position is collected and reported together (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`ArityError::WrongCount`] if the count does not fit, or
    /// [`ArityError::NullArguments`] if nulls are forbidden and present.
    pub fn validate<T: Nullable>(
        &self,
        args: &[T],
        forbid_null_args: bool,
    ) -> Result<(), ArityError> {
        if !self.accepts(args.len()) {
            return Err(ArityError::WrongCount {
                expected: *self,
                actual: args.len(),
            });
        }
        if forbid_null_args {
            let positions: Vec<usize> = args
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_null())
                .map(|(i, _)| i + 1)
                .collect();
            if !positions.is_empty() {
                return Err(ArityError::NullArguments { positions });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ArityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ArityDescriptor::Fixed(n) => write!(f, "{n}"),
            ArityDescriptor::Variable {
                min: Some(min),
                max: Some(max),
            } => write!(f, "{min} to {max}"),
            ArityDescriptor::Variable {
                min: Some(min),
                max: None,
            } => write!(f, "at least {min}"),
            ArityDescriptor::Variable {
                min: None,
                max: Some(max),
            } => write!(f, "at most {max}"),
            ArityDescriptor::Variable {
                min: None,
                max: None,
            }
            | ArityDescriptor::Unknown => f.write_str("any number of"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(n: usize) -> Vec<Option<u8>> {
        vec![Some(0); n]
    }

    #[test]
    fn fixed_arity_rejects_other_counts() {
        let two = ArityDescriptor::Fixed(2);
        assert!(two.validate(&args(2), true).is_ok());
        assert_eq!(
            two.validate(&args(1), true),
            Err(ArityError::WrongCount {
                expected: two,
                actual: 1
            })
        );
        assert!(two.validate(&args(3), false).is_err());
    }

    #[test]
    fn variable_arity_is_inclusive() {
        let range = ArityDescriptor::Variable {
            min: Some(1),
            max: Some(3),
        };
        for n in 1..=3 {
            assert!(range.validate(&args(n), true).is_ok(), "{n} rejected");
        }
        assert!(range.validate(&args(0), true).is_err());
        assert!(range.validate(&args(4), true).is_err());
    }

    #[test]
    fn unknown_bounds_trust_the_caller() {
        let open = ArityDescriptor::Variable {
            min: None,
            max: Some(2),
        };
        assert!(open.validate(&args(0), true).is_ok());
        assert!(open.validate(&args(3), true).is_err());
        let unbounded = ArityDescriptor::Variable { min: None, max: None };
        assert!(unbounded.validate(&args(17), true).is_ok());
        assert!(ArityDescriptor::Unknown.validate(&args(5), true).is_ok());
    }

    #[test]
    fn all_null_positions_are_reported() {
        let three = ArityDescriptor::Fixed(3);
        let sparse = vec![None, Some(1), None];
        assert_eq!(
            three.validate(&sparse, true),
            Err(ArityError::NullArguments {
                positions: vec![1, 3]
            })
        );
        assert!(three.validate(&sparse, false).is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(ArityDescriptor::Fixed(2).to_string(), "2");
        assert_eq!(
            ArityDescriptor::Variable {
                min: Some(1),
                max: Some(3)
            }
            .to_string(),
            "1 to 3"
        );
        assert_eq!(ArityDescriptor::Unknown.to_string(), "any number of");
    }
}
