//! `MOD` and `HASH_MOD` algorithms.

use std::ops::Bound;

use super::{target, Error, Props, Value, ValueRange};

/// Integer modulo over the sharding value.
///
/// The value can be trimmed before parsing: `start-offset` and
/// `stop-offset` drop characters from either end, e.g. to shard
/// on the last digits of an order number.
#[derive(Debug, Clone, PartialEq)]
pub struct Mod {
    count: usize,
    start_offset: usize,
    stop_offset: usize,
    zero_padding: bool,
}

impl Mod {
    pub fn new(props: &Props) -> Result<Self, Error> {
        Ok(Self {
            count: props.positive("sharding-count")?,
            start_offset: props.unsigned_or("start-offset", 0)?,
            stop_offset: props.unsigned_or("stop-offset", 0)?,
            zero_padding: props.bool_or("zero-padding", false)?,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn width(&self) -> Option<usize> {
        if self.zero_padding {
            Some((self.count - 1).to_string().len())
        } else {
            None
        }
    }

    fn trimmed(&self) -> bool {
        self.start_offset > 0 || self.stop_offset > 0
    }

    fn window<'a>(&self, text: &'a str) -> Result<&'a str, Error> {
        if !self.trimmed() {
            return Ok(text);
        }

        let out_of_bounds = || Error::OffsetOutOfBounds {
            value: text.to_string(),
            start: self.start_offset,
            stop: self.stop_offset,
        };

        let end = text
            .len()
            .checked_sub(self.stop_offset)
            .ok_or_else(out_of_bounds)?;
        if self.start_offset >= end {
            return Err(out_of_bounds());
        }
        text.get(self.start_offset..end).ok_or_else(out_of_bounds)
    }

    fn index(&self, value: &Value) -> Result<usize, Error> {
        let text = value.text().ok_or(Error::NullValue)?;
        let window = self.window(&text)?;
        let int: i64 = window
            .trim()
            .parse()
            .map_err(|_| Error::NotAnInteger(window.to_string()))?;
        Ok(int.rem_euclid(self.count as i64) as usize)
    }

    pub fn precise(&self, available: &[String], value: &Value) -> Result<Option<String>, Error> {
        let index = self.index(value)?;
        Ok(target::find(available, index, self.width()).cloned())
    }

    pub fn range(&self, available: &[String], range: &ValueRange) -> Result<Vec<String>, Error> {
        if self.trimmed() {
            return Ok(available.to_vec());
        }

        let (Some(lower), Some(upper)) = (lower(&range.lower)?, upper(&range.upper)?) else {
            return Ok(available.to_vec());
        };

        // Inverted ranges match nothing; route everywhere rather than nowhere.
        if upper < lower {
            return Ok(available.to_vec());
        }

        let span = (upper as i128 - lower as i128) + 1;
        if span >= self.count as i128 {
            return Ok(available.to_vec());
        }

        let count = self.count as i64;
        let indexes = (lower..=upper)
            .map(|value| value.rem_euclid(count) as usize)
            .collect::<Vec<_>>();

        Ok(target::find_all(available, &indexes, self.width()))
    }
}

/// Hash of the value text, modulo the shard count.
#[derive(Debug, Clone, PartialEq)]
pub struct HashMod {
    count: usize,
}

impl HashMod {
    pub fn new(props: &Props) -> Result<Self, Error> {
        Ok(Self {
            count: props.positive("sharding-count")?,
        })
    }

    pub fn precise(&self, available: &[String], value: &Value) -> Result<Option<String>, Error> {
        let text = value.text().ok_or(Error::NullValue)?;
        let index = crc32fast::hash(text.as_bytes()) as usize % self.count;
        Ok(target::find(available, index, None).cloned())
    }

    /// Hashing doesn't preserve order, so any range can hit any target.
    pub fn range(&self, available: &[String]) -> Vec<String> {
        available.to_vec()
    }
}

fn int(value: &Value) -> Result<i64, Error> {
    value
        .int()
        .ok_or_else(|| Error::NotAnInteger(value.to_string()))
}

fn lower(bound: &Bound<Value>) -> Result<Option<i64>, Error> {
    Ok(match bound {
        Bound::Included(value) => Some(int(value)?),
        Bound::Excluded(value) => int(value)?.checked_add(1),
        Bound::Unbounded => None,
    })
}

fn upper(bound: &Bound<Value>) -> Result<Option<i64>, Error> {
    Ok(match bound {
        Bound::Included(value) => Some(int(value)?),
        Bound::Excluded(value) => int(value)?.checked_sub(1),
        Bound::Unbounded => None,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn tables(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("t_order_{}", i)).collect()
    }

    #[test]
    fn test_mod_precise() {
        let algorithm = Mod::new(&Props::default().with("sharding-count", 4)).unwrap();
        let available = tables(4);

        assert_eq!(
            algorithm.precise(&available, &Value::from(5)).unwrap(),
            Some("t_order_1".into())
        );
        assert_eq!(
            algorithm.precise(&available, &Value::from("10")).unwrap(),
            Some("t_order_2".into())
        );
        assert_eq!(
            algorithm.precise(&available, &Value::from(-1)).unwrap(),
            Some("t_order_3".into())
        );
        assert_eq!(
            algorithm.precise(&available[..2], &Value::from(3)).unwrap(),
            None
        );
        assert_eq!(
            algorithm.precise(&available, &Value::Null),
            Err(Error::NullValue)
        );
    }

    #[test]
    fn test_mod_range() {
        let algorithm = Mod::new(&Props::default().with("sharding-count", 4)).unwrap();
        let available = tables(4);

        let range = ValueRange::closed(Value::from(5), Value::from(6));
        assert_eq!(
            algorithm.range(&available, &range).unwrap(),
            vec!["t_order_1", "t_order_2"]
        );

        // Wraps around.
        let range = ValueRange::closed(Value::from(7), Value::from(8));
        assert_eq!(
            algorithm.range(&available, &range).unwrap(),
            vec!["t_order_0", "t_order_3"]
        );

        let range = ValueRange::closed(Value::from(10), Value::from(13));
        assert_eq!(algorithm.range(&available, &range).unwrap(), available);

        let range = ValueRange {
            lower: Bound::Excluded(Value::from(4)),
            upper: Bound::Excluded(Value::from(6)),
        };
        assert_eq!(algorithm.range(&available, &range).unwrap(), vec!["t_order_1"]);

        let range = ValueRange::at_least(Value::from(3));
        assert_eq!(algorithm.range(&available, &range).unwrap(), available);
    }

    #[test]
    fn test_mod_offsets_and_padding() {
        let algorithm = Mod::new(
            &Props::default()
                .with("sharding-count", 16)
                .with("start-offset", 2)
                .with("stop-offset", 1)
                .with("zero-padding", true),
        )
        .unwrap();
        let available = (0..16)
            .map(|i| format!("t_{:02}", i))
            .collect::<Vec<_>>();

        // "AB017X" -> "017" -> 17 % 16 = 1
        assert_eq!(
            algorithm.precise(&available, &Value::from("AB017X")).unwrap(),
            Some("t_01".into())
        );
        assert!(matches!(
            algorithm.precise(&available, &Value::from("AB")),
            Err(Error::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_hash_mod() {
        let algorithm = HashMod::new(&Props::default().with("sharding-count", 3)).unwrap();
        let available = tables(3);
        let first = algorithm.precise(&available, &Value::from("alice")).unwrap();
        let second = algorithm.precise(&available, &Value::from("alice")).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(algorithm.range(&available), available);
    }
}
