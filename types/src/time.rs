use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Reads an optional timestamp that is either RFC 3339 or a naive ISO 8601
/// value, which the backend emits for UTC times.
pub fn lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse(&value).map_err(de::Error::custom))
        .transpose()
}

pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-05-01T10:00:00Z")]
    #[case("2024-05-01T10:00:00")]
    #[case("2024-05-01T10:00:00.123456")]
    #[case("2024-05-01T12:00:00+02:00")]
    fn accepts_backend_timestamps(#[case] value: &str) {
        let parsed = parse(value).unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H").to_string(), "2024-05-01 10");
    }
}
