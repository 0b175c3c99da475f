use chrono::{SecondsFormat, Utc};

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::now_iso8601;

    #[test]
    fn timestamps_are_utc_rfc3339() {
        let stamp = now_iso8601();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
