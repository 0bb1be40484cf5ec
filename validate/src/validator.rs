use aggregator_types::InboundEnvelope;
use once_cell::sync::Lazy;
use regex::Regex;

/// Why an inbound message was rejected.
///
/// Pure and synchronous: no I/O happens here, and the router logs the
/// variant's `Display` as the validation reason before dropping the message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("nodeId does not match the expected node-<uuid> form")]
    InvalidNodeId,
    #[error("{field} is not a valid id hash (lowercase hex, 8-64 chars)")]
    InvalidHash { field: &'static str },
    #[error("{field} is not a valid bucket string")]
    InvalidBucket { field: &'static str },
    #[error("{field} exceeds the 64-character limit")]
    StringTooLong { field: &'static str },
    #[error("locationBucket is not a valid \"<lat>,<lon>\" pair")]
    InvalidLocationBucket,
    #[error("data field is present but not an object")]
    DataNotAnObject,
}

static NODE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^node-[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("static regex is valid")
});

static HASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{8,64}$").expect("static regex is valid"));

// Buckets like "100-500ms" need digits and letters alongside `-<>`, so the
// charset is ASCII alphanumerics plus `-<>` rather than digits-and-symbols
// only, while still rejecting anything that could carry injection payloads
// (spaces, quotes, SQL metacharacters). See DESIGN.md.
static BUCKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z<>\-]{1,20}$").expect("static regex is valid"));

/// `nodeId` matches `node-<36-char-uuid-form>`.
pub fn is_valid_node_id(node_id: &str) -> bool {
    NODE_ID_RE.is_match(node_id)
}

/// Lowercase hex, 8-64 chars.
pub fn is_valid_hash(value: &str) -> bool {
    HASH_RE.is_match(value)
}

/// Short ASCII bucket string, <=20 chars.
pub fn is_valid_bucket(value: &str) -> bool {
    BUCKET_RE.is_match(value)
}

/// `locationBucket` is `"<lat>,<lon>"` with both components finite and in range.
pub fn is_valid_location_bucket(value: &str) -> bool {
    let Some((lat_str, lon_str)) = value.split_once(',') else {
        return false;
    };
    let Ok(lat) = lat_str.trim().parse::<f64>() else {
        return false;
    };
    let Ok(lon) = lon_str.trim().parse::<f64>() else {
        return false;
    };
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

fn check_hash(envelope: &InboundEnvelope, field: &'static str) -> Result<(), ValidationError> {
    match envelope.data_str(field) {
        Some(value) if is_valid_hash(value) => Ok(()),
        Some(_) => Err(ValidationError::InvalidHash { field }),
        None => Ok(()),
    }
}

fn check_bucket(envelope: &InboundEnvelope, field: &'static str) -> Result<(), ValidationError> {
    match envelope.data_str(field) {
        Some(value) if is_valid_bucket(value) => Ok(()),
        Some(_) => Err(ValidationError::InvalidBucket { field }),
        None => Ok(()),
    }
}

fn check_short_string(envelope: &InboundEnvelope, field: &'static str) -> Result<(), ValidationError> {
    match envelope.data_str(field) {
        Some(value) if value.chars().count() <= 64 => Ok(()),
        Some(_) => Err(ValidationError::StringTooLong { field }),
        None => Ok(()),
    }
}

/// Validates an inbound envelope. Runs before the rate limiter so malformed
/// payloads never consume per-node budget.
pub fn validate_envelope(envelope: &InboundEnvelope) -> Result<(), ValidationError> {
    if let Some(node_id) = envelope.node_id.as_deref() {
        if !is_valid_node_id(node_id) {
            return Err(ValidationError::InvalidNodeId);
        }
    }

    let Some(data) = envelope.data.as_ref() else {
        return Ok(());
    };
    if !data.is_object() {
        return Err(ValidationError::DataNotAnObject);
    }

    check_hash(envelope, "taskIdHash")?;
    check_hash(envelope, "invoiceIdHash")?;

    for field in [
        "executionTimeBucket",
        "gasUsedBucket",
        "stepsComputedBucket",
        "memoryUsedBucket",
        "totalTasksBucket",
        "activeTasksBucket",
    ] {
        check_bucket(envelope, field)?;
    }

    for field in ["chainId", "taskType", "status", "operation", "continentBucket"] {
        check_short_string(envelope, field)?;
    }

    if let Some(location) = envelope.data_str("locationBucket") {
        if !is_valid_location_bucket(location) {
            return Err(ValidationError::InvalidLocationBucket);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_with_data(data: serde_json::Value) -> InboundEnvelope {
        InboundEnvelope {
            node_id: Some("node-00000000-0000-0000-0000-000000000001".to_string()),
            data: Some(data),
        }
    }

    #[test]
    fn accepts_well_formed_task_received() {
        let envelope = envelope_with_data(json!({
            "taskIdHash": "aabbccdd",
            "chainId": "1",
            "taskType": "wasm",
        }));
        assert!(validate_envelope(&envelope).is_ok());
    }

    #[test]
    fn rejects_bad_node_id() {
        let envelope = InboundEnvelope {
            node_id: Some("not-a-node-id".to_string()),
            data: None,
        };
        assert_eq!(validate_envelope(&envelope), Err(ValidationError::InvalidNodeId));
    }

    #[test]
    fn missing_node_id_is_not_a_validation_error() {
        let envelope = InboundEnvelope {
            node_id: None,
            data: Some(json!({"taskIdHash": "aabbccdd"})),
        };
        assert!(validate_envelope(&envelope).is_ok());
    }

    #[test]
    fn rejects_hash_with_uppercase_or_bad_length() {
        let envelope = envelope_with_data(json!({"taskIdHash": "AABBCCDD"}));
        assert!(validate_envelope(&envelope).is_err());

        let envelope = envelope_with_data(json!({"taskIdHash": "ab"}));
        assert!(validate_envelope(&envelope).is_err());
    }

    #[test]
    fn accepts_realistic_bucket_shapes() {
        let envelope = envelope_with_data(json!({"executionTimeBucket": "100-500ms"}));
        assert!(validate_envelope(&envelope).is_ok());

        let envelope = envelope_with_data(json!({"gasUsedBucket": ">1M"}));
        assert!(validate_envelope(&envelope).is_ok());
    }

    #[test]
    fn rejects_bucket_outside_allowed_charset() {
        let envelope = envelope_with_data(json!({"executionTimeBucket": "100 500ms"}));
        assert!(validate_envelope(&envelope).is_err());

        let envelope = envelope_with_data(json!({"executionTimeBucket": "100-500ms'; DROP"}));
        assert!(validate_envelope(&envelope).is_err());
    }

    #[test]
    fn accepts_valid_location_bucket() {
        let envelope = envelope_with_data(json!({"locationBucket": "37.77,-122.41"}));
        assert!(validate_envelope(&envelope).is_ok());
    }

    #[test]
    fn rejects_out_of_range_location_bucket() {
        let envelope = envelope_with_data(json!({"locationBucket": "91.0,0.0"}));
        assert!(validate_envelope(&envelope).is_err());

        let envelope = envelope_with_data(json!({"locationBucket": "notanumber,0.0"}));
        assert!(validate_envelope(&envelope).is_err());
    }

    #[test]
    fn unknown_fields_in_data_are_ignored() {
        let envelope = envelope_with_data(json!({"taskIdHash": "aabbccdd", "somethingElse": true}));
        assert!(validate_envelope(&envelope).is_ok());
    }
}
