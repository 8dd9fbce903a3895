use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Payload kind of a history entry. Only text is captured today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Text,
}

/// One clipboard history record
///
/// The on-disk shape is `{id, content, createdAt, pinned, kind}`. Unknown
/// fields are ignored when reading so newer files stay loadable.
/// `createdAt` is read from an RFC 3339 string or epoch seconds; files
/// using the older `date` / `isPinned` names load too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub content: String,
    #[serde(alias = "date", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "isPinned")]
    pub pinned: bool,
    #[serde(default)]
    pub kind: EntryKind,
}

impl Entry {
    /// Create a new unpinned text entry stamped with the current time
    pub fn new_text(content: String) -> Self {
        Self::with_pin(content, false)
    }

    /// Create a new text entry with a fresh id and timestamp, keeping `pinned`
    pub fn with_pin(content: String, pinned: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            created_at: Utc::now(),
            pinned,
            kind: EntryKind::Text,
        }
    }

    /// Single-line preview, truncated on a char boundary
    pub fn preview(&self, max_chars: usize) -> String {
        let line: String = self
            .content
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        if line.chars().count() > max_chars {
            let cut: String = line.chars().take(max_chars).collect();
            format!("{}...", cut)
        } else {
            line
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Seconds(i64),
    FractionalSeconds(f64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| D::Error::custom(format!("invalid timestamp {:?}: {}", text, e))),
        RawTimestamp::Seconds(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| D::Error::custom(format!("epoch seconds out of range: {}", secs))),
        RawTimestamp::FractionalSeconds(value) => {
            if !value.is_finite() {
                return Err(D::Error::custom("epoch seconds must be finite"));
            }
            let secs = value.floor();
            let nanos = ((value - secs) * 1_000_000_000.0) as u32;
            Utc.timestamp_opt(secs as i64, nanos.min(999_999_999))
                .single()
                .ok_or_else(|| D::Error::custom(format!("epoch seconds out of range: {}", value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_text_assigns_unique_ids() {
        let a = Entry::new_text("same".to_string());
        let b = Entry::new_text("same".to_string());
        assert_ne!(a.id, b.id);
        assert!(!a.pinned);
        assert_eq!(a.kind, EntryKind::Text);
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = Entry::with_pin("hello".to_string(), true);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["content"], "hello");
        assert_eq!(json["pinned"], true);
        assert_eq!(json["kind"], "text");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = r#"{
            "id": "1",
            "content": "x",
            "createdAt": "2024-05-01T10:00:00Z",
            "pinned": false,
            "sourceApp": "Terminal"
        }"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.content, "x");
        assert_eq!(entry.kind, EntryKind::Text);
    }

    #[test]
    fn test_epoch_seconds_timestamp() {
        let raw = r#"{"id": "1", "content": "x", "createdAt": 1714557600, "pinned": true}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.created_at, Utc.timestamp_opt(1_714_557_600, 0).unwrap());
        assert!(entry.pinned);
    }

    #[test]
    fn test_fractional_epoch_and_legacy_field_names() {
        let raw = r#"{"id": "1", "content": "x", "date": 1714557600.5, "isPinned": true}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.created_at.timestamp(), 1_714_557_600);
        assert_eq!(entry.created_at.timestamp_subsec_millis(), 500);
        assert!(entry.pinned);
    }

    #[test]
    fn test_rfc3339_offset_normalized_to_utc() {
        let raw = r#"{"id": "1", "content": "x", "createdAt": "2024-05-01T12:00:00+02:00"}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(!entry.pinned);
    }

    #[test]
    fn test_garbage_timestamp_rejected() {
        let raw = r#"{"id": "1", "content": "x", "createdAt": "yesterday"}"#;
        assert!(serde_json::from_str::<Entry>(raw).is_err());
    }

    #[test]
    fn test_preview_truncates_multibyte_safely() {
        let entry = Entry::new_text("héllo\nwörld".to_string());
        assert_eq!(entry.preview(5), "héllo...");
        assert_eq!(entry.preview(100), "héllo wörld");
    }
}
