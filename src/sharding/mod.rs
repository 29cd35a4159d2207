//! Sharding algorithms.
//!
//! An algorithm maps a sharding value to one of the available targets,
//! which are either data source names or actual table names. Built-in
//! algorithms are resolved once from their type name when rules are loaded.

use std::ops::Bound;

use tracing::trace;

pub mod error;
pub mod interval;
pub mod modulo;
pub mod props;
pub mod range;
pub mod target;
pub mod value;

pub use error::Error;
pub use props::{PropValue, Props};
pub use value::Value;

use interval::Interval;
use modulo::{HashMod, Mod};
use range::BoundaryRange;

/// Range of sharding values, e.g. `BETWEEN 10 AND 19` or `> 5`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub lower: Bound<Value>,
    pub upper: Bound<Value>,
}

impl ValueRange {
    pub fn closed(lower: Value, upper: Value) -> Self {
        Self {
            lower: Bound::Included(lower),
            upper: Bound::Included(upper),
        }
    }

    pub fn at_least(lower: Value) -> Self {
        Self {
            lower: Bound::Included(lower),
            upper: Bound::Unbounded,
        }
    }

    pub fn greater_than(lower: Value) -> Self {
        Self {
            lower: Bound::Excluded(lower),
            upper: Bound::Unbounded,
        }
    }

    pub fn at_most(upper: Value) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Included(upper),
        }
    }

    pub fn less_than(upper: Value) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Excluded(upper),
        }
    }

    pub fn all() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        )
    }

    /// Is the value inside the range? `None` if values can't be compared.
    pub fn contains(&self, value: &Value) -> Option<bool> {
        let above = match &self.lower {
            Bound::Included(lower) => value.partial_cmp(lower)?.is_ge(),
            Bound::Excluded(lower) => value.partial_cmp(lower)?.is_gt(),
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(upper) => value.partial_cmp(upper)?.is_le(),
            Bound::Excluded(upper) => value.partial_cmp(upper)?.is_lt(),
            Bound::Unbounded => true,
        };
        Some(above && below)
    }

    /// Narrow the range with another one, e.g. `a > 5 AND a < 10`.
    ///
    /// Bounds that can't be compared keep the current value.
    pub fn intersect(&self, other: &ValueRange) -> ValueRange {
        ValueRange {
            lower: tighter(&self.lower, &other.lower, true),
            upper: tighter(&self.upper, &other.upper, false),
        }
    }
}

fn tighter(current: &Bound<Value>, other: &Bound<Value>, lower: bool) -> Bound<Value> {
    let value = |bound: &Bound<Value>| match bound {
        Bound::Included(value) | Bound::Excluded(value) => Some(value.clone()),
        Bound::Unbounded => None,
    };

    match (value(current), value(other)) {
        (None, _) => other.clone(),
        (_, None) => current.clone(),
        (Some(a), Some(b)) => match a.partial_cmp(&b) {
            None => current.clone(),
            Some(ordering) if ordering.is_eq() => {
                if matches!(other, Bound::Excluded(_)) {
                    other.clone()
                } else {
                    current.clone()
                }
            }
            Some(ordering) => {
                if ordering.is_lt() == lower {
                    other.clone()
                } else {
                    current.clone()
                }
            }
        },
    }
}

/// Sharding algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum Algorithm {
    Mod(Mod),
    HashMod(HashMod),
    BoundaryRange(BoundaryRange),
    Interval(Interval),
}

impl Algorithm {
    /// Create algorithm from its type name and properties.
    pub fn new(kind: &str, props: &Props) -> Result<Self, Error> {
        match kind.to_uppercase().as_str() {
            "MOD" => Ok(Self::Mod(Mod::new(props)?)),
            "HASH_MOD" => Ok(Self::HashMod(HashMod::new(props)?)),
            "BOUNDARY_RANGE" => Ok(Self::BoundaryRange(BoundaryRange::new(props)?)),
            "INTERVAL" => Ok(Self::Interval(Interval::fixed(props)?)),
            "AUTO_INTERVAL" => Ok(Self::Interval(Interval::auto(props)?)),
            _ => Err(Error::UnknownAlgorithm(kind.to_string())),
        }
    }

    /// Name of the algorithm type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mod(_) => "MOD",
            Self::HashMod(_) => "HASH_MOD",
            Self::BoundaryRange(_) => "BOUNDARY_RANGE",
            Self::Interval(_) => "INTERVAL",
        }
    }

    /// Target for a single value, if one of the available targets matches.
    pub fn precise(
        &self,
        available: &[String],
        logic_table: &str,
        value: &Value,
    ) -> Result<Option<String>, Error> {
        let target = match self {
            Self::Mod(algorithm) => algorithm.precise(available, value)?,
            Self::HashMod(algorithm) => algorithm.precise(available, value)?,
            Self::BoundaryRange(algorithm) => algorithm.precise(available, value)?,
            Self::Interval(algorithm) => algorithm.precise(available, value)?,
        };

        trace!(
            "{} [{}]: {} -> {:?}",
            self.kind(),
            logic_table,
            value,
            target
        );

        Ok(target)
    }

    /// Targets that can contain values inside the range,
    /// in the order they are available.
    pub fn range(
        &self,
        available: &[String],
        logic_table: &str,
        range: &ValueRange,
    ) -> Result<Vec<String>, Error> {
        if range.is_unbounded() {
            return Ok(available.to_vec());
        }

        let targets = match self {
            Self::Mod(algorithm) => algorithm.range(available, range)?,
            Self::HashMod(algorithm) => algorithm.range(available),
            Self::BoundaryRange(algorithm) => algorithm.range(available, range)?,
            Self::Interval(algorithm) => algorithm.range(available, range)?,
        };

        trace!(
            "{} [{}]: {:?} -> {:?}",
            self.kind(),
            logic_table,
            range,
            targets
        );

        Ok(targets)
    }

    /// Targets for values supplied out of band, e.g. by a hint.
    pub fn hint(
        &self,
        available: &[String],
        logic_table: &str,
        values: &[Value],
    ) -> Result<Vec<String>, Error> {
        let mut matched = vec![];
        for value in values {
            if let Some(target) = self.precise(available, logic_table, value)? {
                matched.push(target);
            }
        }

        Ok(available
            .iter()
            .filter(|target| matched.contains(target))
            .cloned()
            .collect())
    }
}
