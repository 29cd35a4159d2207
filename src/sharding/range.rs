//! `BOUNDARY_RANGE` algorithm.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::{target, Error, Props, Value, ValueRange};

/// Partitions split at fixed boundaries.
///
/// `sharding-ranges = "10,20,30"` creates four partitions:
/// `(-inf, 10)`, `[10, 20)`, `[20, 30)` and `[30, +inf)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRange {
    /// Lower boundary -> partition starting at it.
    partitions: BTreeMap<i64, usize>,
}

impl BoundaryRange {
    pub fn new(props: &Props) -> Result<Self, Error> {
        let ranges = props.required_str("sharding-ranges")?;
        let invalid = || Error::InvalidProperty {
            key: "sharding-ranges".into(),
            value: ranges.clone(),
        };

        let mut partitions = BTreeMap::new();
        let mut previous = None;
        for (i, boundary) in ranges.split(',').enumerate() {
            let boundary: i64 = boundary.trim().parse().map_err(|_| invalid())?;
            if previous.map(|p| p >= boundary).unwrap_or(false) {
                return Err(invalid());
            }
            previous = Some(boundary);
            partitions.insert(boundary, i + 1);
        }

        Ok(Self { partitions })
    }

    pub fn count(&self) -> usize {
        self.partitions.len() + 1
    }

    fn partition(&self, value: i64) -> usize {
        self.partitions
            .range(..=value)
            .next_back()
            .map(|(_, partition)| *partition)
            .unwrap_or(0)
    }

    fn int(value: &Value) -> Result<i64, Error> {
        value
            .int()
            .ok_or_else(|| Error::NotAnInteger(value.to_string()))
    }

    pub fn precise(&self, available: &[String], value: &Value) -> Result<Option<String>, Error> {
        if value.is_null() {
            return Err(Error::NullValue);
        }
        let partition = self.partition(Self::int(value)?);
        Ok(target::find(available, partition, None).cloned())
    }

    pub fn range(&self, available: &[String], range: &ValueRange) -> Result<Vec<String>, Error> {
        let first = match &range.lower {
            Bound::Included(value) | Bound::Excluded(value) => self.partition(Self::int(value)?),
            Bound::Unbounded => 0,
        };
        let last = match &range.upper {
            Bound::Included(value) | Bound::Excluded(value) => self.partition(Self::int(value)?),
            Bound::Unbounded => self.count() - 1,
        };

        if last < first {
            return Ok(available.to_vec());
        }

        let partitions = (first..=last).collect::<Vec<_>>();
        Ok(target::find_all(available, &partitions, None))
    }
}
