use super::Time;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NEVER: &str = "never";

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            if self.is_never() {
                serializer.serialize_str(NEVER)
            } else {
                serializer.serialize_f64(self.as_secs_f64())
            }
        } else {
            serializer.serialize_i64(self.as_nanos())
        }
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SecsVisitor;
        impl<'de> Visitor<'de> for SecsVisitor {
            type Value = Time;
            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number of seconds or \"never\"")
            }

            fn visit_f64<E: Error>(self, v: f64) -> Result<Time, E> {
                Ok(Time::from_secs_f64(v))
            }

            fn visit_i64<E: Error>(self, v: i64) -> Result<Time, E> {
                Ok(Time::from_secs(v))
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Time, E> {
                i64::try_from(v)
                    .map(Time::from_secs)
                    .map_err(|_| E::custom("seconds out of range"))
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Time, E> {
                if v == NEVER {
                    Ok(Time::NEVER)
                } else {
                    Err(E::invalid_value(serde::de::Unexpected::Str(v), &self))
                }
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(SecsVisitor)
        } else {
            i64::deserialize(deserializer).map(Time::from_nanos)
        }
    }
}
