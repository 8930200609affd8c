use chrono::{DateTime, SecondsFormat, Utc};

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix millis to a UTC `DateTime`.
///
/// Out-of-range values clamp to the Unix epoch.
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Format Unix millis as RFC3339 with whole seconds in UTC (`2024-05-01T08:30:00Z`).
pub fn millis_to_rfc3339(millis: i64) -> String {
    millis_to_datetime(millis).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp (any offset) into Unix millis.
pub fn parse_rfc3339_millis(value: &str) -> Result<i64, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).timestamp_millis())
}

/// 去掉十六进制字符串的 0x 前缀
pub fn strip_hex_prefix(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let millis = parse_rfc3339_millis("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(millis_to_rfc3339(millis), "2024-05-01T08:30:00Z");
    }

    #[test]
    fn rfc3339_drops_sub_second_precision() {
        let millis = parse_rfc3339_millis("2024-05-01T08:30:00.750Z").unwrap();
        assert_eq!(millis % 1000, 750);
        assert_eq!(millis_to_rfc3339(millis), "2024-05-01T08:30:00Z");
    }

    #[test]
    fn invalid_rfc3339_is_rejected() {
        assert!(parse_rfc3339_millis("yesterday").is_err());
    }

    #[test]
    fn strips_hex_prefix() {
        assert_eq!(strip_hex_prefix("0xabc"), "abc");
        assert_eq!(strip_hex_prefix(" 0Xabc "), "abc");
        assert_eq!(strip_hex_prefix("abc"), "abc");
    }
}
