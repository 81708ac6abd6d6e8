//! Comparison operators shared by the comparison checks.

use std::fmt;

/// The type of comparison a check makes between its reference value (left
/// side) and the value taken from the event (right side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOperation {
    /// `x > y`
    Higher,
    /// `x >= y`
    HigherOrEqual,
    /// `x == y`
    Equal,
    /// `x != y`
    NotEqual,
    /// `x < y`
    Lower,
    /// `x <= y`
    LowerOrEqual,
    /// `y.contains(x)`
    Contains,
    /// `!y.contains(x)`
    NotContains,
}

impl CheckOperation {
    /// Human-readable operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Higher => ">",
            Self::HigherOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Lower => "<",
            Self::LowerOrEqual => "<=",
            Self::Contains => "in",
            Self::NotContains => "!in",
        }
    }

    /// Whether this operator applies to a collection rather than a single value.
    pub fn for_collection(self) -> bool {
        matches!(self, Self::Contains | Self::NotContains)
    }

    /// Panic unless this is a single-value operator.
    ///
    /// # Panics
    ///
    /// Panics for [`CheckOperation::Contains`] and [`CheckOperation::NotContains`].
    pub fn assert_single(self, subject: &str) {
        if self.for_collection() {
            panic!(
                "Given check ({}) is not valid for single {}",
                self.symbol(),
                subject
            );
        }
    }

    /// Panic unless this is a collection operator.
    ///
    /// # Panics
    ///
    /// Panics for every operator except `Contains`/`NotContains`.
    pub fn assert_collection(self, subject: &str) {
        if !self.for_collection() {
            panic!(
                "Given check ({}) is not valid for multiple {}",
                self.symbol(),
                subject
            );
        }
    }

    /// Compare `reference` against `other`.
    ///
    /// A missing `other` ranks below any concrete value: `Higher`,
    /// `HigherOrEqual` and `Equal` give `false`, while `Lower`,
    /// `LowerOrEqual` and `NotEqual` give `true`.
    ///
    /// # Panics
    ///
    /// Panics when called with a collection operator.
    pub fn compare<T: Ord>(self, reference: &T, other: Option<&T>) -> bool {
        self.assert_single("values");

        let Some(other) = other else {
            return matches!(self, Self::Lower | Self::LowerOrEqual | Self::NotEqual);
        };

        match self {
            Self::Higher => reference > other,
            Self::HigherOrEqual => reference >= other,
            Self::Lower => reference < other,
            Self::LowerOrEqual => reference <= other,
            Self::Equal => reference == other,
            Self::NotEqual => reference != other,
            Self::Contains | Self::NotContains => unreachable!(),
        }
    }

    /// Check membership of `reference` within `others`.
    ///
    /// # Panics
    ///
    /// Panics when called with a single-value operator.
    pub fn compare_collection<T: PartialEq>(self, reference: &T, others: &[T]) -> bool {
        self.assert_collection("values");

        let contained = others.contains(reference);
        match self {
            Self::Contains => contained,
            Self::NotContains => !contained,
            _ => unreachable!(),
        }
    }
}

impl fmt::Display for CheckOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
