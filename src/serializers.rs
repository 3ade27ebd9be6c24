//! Custom serde encodings for configuration types.

pub(crate) mod timeout {
    use chrono::DateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::config::Timeout;

    pub(crate) fn serialize<S>(timeout: &Timeout, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timeout {
            Timeout::Never => serializer.serialize_none(),
            Timeout::After(duration) => {
                serializer.serialize_str(&humantime::format_duration(*duration).to_string())
            }
            Timeout::AtDateTime(deadline) => serializer.serialize_str(&deadline.to_rfc3339()),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Timeout, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            None => Ok(Timeout::Never),
            Some(value) => {
                humantime::parse_duration(&value)
                    .map(Timeout::After)
                    // On failure, fall back to RFC3339 format
                    .or_else(|_| {
                        DateTime::parse_from_rfc3339(&value)
                            .map(Timeout::AtDateTime)
                            .map_err(|e| {
                                serde::de::Error::custom(format!(
                                    "timeout must be a humantime duration or RFC3339 timestamp; got {value:?}: {e:?}"
                                ))
                            })
                    })
            }
        }
    }
}
