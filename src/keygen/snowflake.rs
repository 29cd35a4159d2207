//! Snowflake key generator.
//!
//! 64-bit keys: 41 bits of milliseconds since 2016-11-01, 10 bits of
//! worker id and a 12-bit sequence within the millisecond.

use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use super::{Error, KeyGenerator};
use crate::sharding::{Props, Value};

/// 2016-11-01T00:00:00Z
pub const EPOCH: i64 = 1_477_958_400_000;

const SEQUENCE_BITS: u32 = 12;
const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
pub const MAX_WORKER_ID: i64 = (1 << WORKER_ID_BITS) - 1;

#[derive(Debug, Default)]
struct State {
    last_millis: i64,
    sequence: i64,
    vibration: i64,
}

#[derive(Debug)]
pub struct Snowflake {
    worker_id: i64,
    max_tolerate_millis: i64,
    max_vibration_offset: i64,
    state: Mutex<State>,
}

impl Snowflake {
    pub fn new(props: &Props) -> Result<Self, Error> {
        let worker_id = props.int_or("worker-id", 0)?;
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(crate::sharding::Error::InvalidProperty {
                key: "worker-id".into(),
                value: worker_id.to_string(),
            }
            .into());
        }

        let max_tolerate_millis =
            props.unsigned_or("max-tolerate-time-difference-milliseconds", 10)? as i64;

        let max_vibration_offset = props.unsigned_or("max-vibration-offset", 1)? as i64;
        if max_vibration_offset > SEQUENCE_MASK {
            return Err(crate::sharding::Error::InvalidProperty {
                key: "max-vibration-offset".into(),
                value: max_vibration_offset.to_string(),
            }
            .into());
        }

        Ok(Self {
            worker_id,
            max_tolerate_millis,
            max_vibration_offset,
            state: Mutex::new(State::default()),
        })
    }

    /// Next key for the given wall clock time.
    fn next_id(&self, now: i64) -> Result<i64, Error> {
        let mut state = self.state.lock();
        let mut now = now;

        if now < state.last_millis {
            let behind = state.last_millis - now;
            if behind > self.max_tolerate_millis {
                return Err(Error::ClockMovedBack(behind));
            }
            warn!("clock moved backwards by {}ms, reusing last timestamp", behind);
            now = state.last_millis;
        }

        if now == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted, borrow the next millisecond.
                now = state.last_millis + 1;
                let sequence = self.vibrate(&mut state);
                state.sequence = sequence;
            }
        } else {
            let sequence = self.vibrate(&mut state);
            state.sequence = sequence;
        }

        state.last_millis = now;

        Ok(((now - EPOCH) << TIMESTAMP_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | state.sequence)
    }

    /// Starting sequence for a new millisecond. Alternating it keeps
    /// low-traffic keys from all being even.
    fn vibrate(&self, state: &mut State) -> i64 {
        state.vibration = if state.vibration >= self.max_vibration_offset {
            0
        } else {
            state.vibration + 1
        };
        state.vibration
    }
}

impl KeyGenerator for Snowflake {
    fn generate(&self) -> Result<Value, Error> {
        self.next_id(Utc::now().timestamp_millis())
            .map(Value::Integer)
    }
}
