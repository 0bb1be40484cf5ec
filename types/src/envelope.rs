use serde::Deserialize;
use serde_json::Value;

/// The inbound message envelope.
///
/// Unknown top-level and `data` fields are ignored rather than rejected, so
/// this is deliberately loose: `data` stays a [`Value`] and the validator
/// (in `aggregator-validate`) picks out only the subfields it cares about.
/// The five known subjects all share this one tagged-envelope-over-a-dynamic-
/// payload shape.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct InboundEnvelope {
    #[serde(rename = "nodeId")]
    pub node_id: Option<String>,
    pub data: Option<Value>,
}

impl InboundEnvelope {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// A string subfield of `data`, if present and actually a string.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }

    /// A bool subfield of `data`, if present and actually a bool.
    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.as_ref()?.get(key)?.as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_ignored_not_rejected() {
        let raw = br#"{"nodeId":"node-1","data":{"taskIdHash":"aabb"},"extra":"whatever","data2":123}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();
        assert_eq!(envelope.node_id.as_deref(), Some("node-1"));
        assert_eq!(envelope.data_str("taskIdHash"), Some("aabb"));
    }

    #[test]
    fn missing_node_id_and_data_parse_fine() {
        let raw = br#"{}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();
        assert!(envelope.node_id.is_none());
        assert!(envelope.data.is_none());
    }
}
