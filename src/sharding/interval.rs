//! `INTERVAL` and `AUTO_INTERVAL` algorithms.

use std::ops::Bound;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::{target, Error, Props, Value, ValueRange};

pub const DEFAULT_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed-width time partitions starting at a lower datetime.
///
/// Values before the first partition land in it; values after
/// the last one land in the last.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    lower: NaiveDateTime,
    seconds: i64,
    count: usize,
    pattern: String,
}

impl Interval {
    /// Partitions configured with an explicit count.
    pub fn fixed(props: &Props) -> Result<Self, Error> {
        let pattern = props
            .str("datetime-pattern")
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
        let lower = Self::property(props, "datetime-lower", &pattern)?;

        Ok(Self {
            lower,
            seconds: props.positive("sharding-seconds")? as i64,
            count: props.positive("partition-count")?,
            pattern,
        })
    }

    /// Partitions covering `[datetime-lower, datetime-upper]`.
    pub fn auto(props: &Props) -> Result<Self, Error> {
        let pattern = props
            .str("datetime-pattern")
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
        let lower = Self::property(props, "datetime-lower", &pattern)?;
        let upper = Self::property(props, "datetime-upper", &pattern)?;
        let seconds = props.positive("sharding-seconds")? as i64;

        if upper < lower {
            return Err(Error::InvalidProperty {
                key: "datetime-upper".into(),
                value: props.required_str("datetime-upper")?,
            });
        }

        let count = ((upper - lower).num_seconds() / seconds) as usize + 1;

        Ok(Self {
            lower,
            seconds,
            count,
            pattern,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn property(props: &Props, key: &str, pattern: &str) -> Result<NaiveDateTime, Error> {
        let value = props.required_str(key)?;
        parse(&value, pattern).map_err(|_| Error::InvalidProperty {
            key: key.to_string(),
            value,
        })
    }

    fn timestamp(&self, value: &Value) -> Result<NaiveDateTime, Error> {
        match value {
            Value::Null => Err(Error::NullValue),
            // Epoch seconds.
            Value::Integer(seconds) => DateTime::from_timestamp(*seconds, 0)
                .map(|ts| ts.naive_utc())
                .ok_or_else(|| Error::InvalidDatetime {
                    value: seconds.to_string(),
                    pattern: self.pattern.clone(),
                }),
            other => {
                let text = other.to_string();
                parse(&text, &self.pattern)
            }
        }
    }

    fn partition(&self, timestamp: NaiveDateTime) -> usize {
        let delta = (timestamp - self.lower).num_seconds();
        let partition = delta.div_euclid(self.seconds);
        partition.clamp(0, self.count as i64 - 1) as usize
    }

    pub fn precise(&self, available: &[String], value: &Value) -> Result<Option<String>, Error> {
        let partition = self.partition(self.timestamp(value)?);
        Ok(target::find(available, partition, None).cloned())
    }

    /// Every partition intersecting the range, both ends included.
    pub fn range(&self, available: &[String], range: &ValueRange) -> Result<Vec<String>, Error> {
        let first = match &range.lower {
            Bound::Included(value) | Bound::Excluded(value) => {
                self.partition(self.timestamp(value)?)
            }
            Bound::Unbounded => 0,
        };
        let last = match &range.upper {
            Bound::Included(value) | Bound::Excluded(value) => {
                self.partition(self.timestamp(value)?)
            }
            Bound::Unbounded => self.count - 1,
        };

        if last < first {
            return Ok(available.to_vec());
        }

        let partitions = (first..=last).collect::<Vec<_>>();
        Ok(target::find_all(available, &partitions, None))
    }
}

/// Parse a datetime, accepting date-only patterns too.
fn parse(value: &str, pattern: &str) -> Result<NaiveDateTime, Error> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, pattern)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::InvalidDatetime {
            value: value.to_string(),
            pattern: pattern.to_string(),
        })
}

#[cfg(test)]
mod test {
    use super::*;

    fn daily() -> Interval {
        Interval::fixed(
            &Props::default()
                .with("datetime-lower", "2024-01-01 00:00:00")
                .with("sharding-seconds", 86400)
                .with("partition-count", 3),
        )
        .unwrap()
    }

    fn available() -> Vec<String> {
        vec!["t_log_0".into(), "t_log_1".into(), "t_log_2".into()]
    }

    #[test]
    fn test_precise() {
        let interval = daily();
        let available = available();

        assert_eq!(
            interval
                .precise(&available, &Value::from("2024-01-01 23:59:59"))
                .unwrap(),
            Some("t_log_0".into())
        );
        assert_eq!(
            interval
                .precise(&available, &Value::from("2024-01-02 00:00:00"))
                .unwrap(),
            Some("t_log_1".into())
        );
        // Clamped to the first and last partitions.
        assert_eq!(
            interval
                .precise(&available, &Value::from("2023-06-01 00:00:00"))
                .unwrap(),
            Some("t_log_0".into())
        );
        assert_eq!(
            interval
                .precise(&available, &Value::from("2030-01-01 00:00:00"))
                .unwrap(),
            Some("t_log_2".into())
        );
        assert!(matches!(
            interval.precise(&available, &Value::from("yesterday")),
            Err(Error::InvalidDatetime { .. })
        ));
    }

    #[test]
    fn test_range_crossing_boundary() {
        let interval = daily();
        let range = ValueRange::closed(
            Value::from("2024-01-01 23:00:00"),
            Value::from("2024-01-02 01:00:00"),
        );
        assert_eq!(
            interval.range(&available(), &range).unwrap(),
            vec!["t_log_0", "t_log_1"]
        );
    }

    #[test]
    fn test_epoch_seconds() {
        let interval = daily();
        // 2024-01-02 12:00:00 UTC
        assert_eq!(
            interval
                .precise(&available(), &Value::from(1_704_196_800))
                .unwrap(),
            Some("t_log_1".into())
        );
    }

    #[test]
    fn test_auto_interval() {
        let interval = Interval::auto(
            &Props::default()
                .with("datetime-lower", "2024-01-01")
                .with("datetime-upper", "2024-01-10")
                .with("datetime-pattern", "%Y-%m-%d")
                .with("sharding-seconds", 86400),
        )
        .unwrap();
        assert_eq!(interval.count(), 10);
    }
}
