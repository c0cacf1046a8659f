// [libs/api/storage/src/payload.rs]
//! Encoding rules for the three buckets (spec.md §4.4): `final` accepts
//! a caller-declared `str`/`bytes`/`pickle` output type with a
//! self-describing fallback; `intermediate`/`local` always use the
//! self-describing encoding regardless of the declared type.

use flame_telemetry::Logger;
use serde::Serialize;

/// A result value on its way into the `final` bucket. `Object` covers
/// any analysis-defined type; `Str`/`Bytes` let a caller hand over an
/// already-rendered representation directly.
pub enum FinalResult<'a, T> {
    Str(String),
    Bytes(Vec<u8>),
    Object(&'a T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Str,
    Bytes,
}

/// Always the self-describing encoding: the only encoding used for
/// `intermediate`/`local` writes, and the fallback for `final` writes.
pub fn encode_pickled<T: Serialize>(result: &FinalResult<'_, T>) -> Result<Vec<u8>, flame_serialization::SerializationError> {
    match result {
        FinalResult::Str(s) => flame_serialization::encode(s),
        FinalResult::Bytes(b) => flame_serialization::encode(b),
        FinalResult::Object(value) => flame_serialization::encode(value),
    }
}

/// Encodes for the `final` bucket per the declared `output_type`,
/// falling back to the self-describing encoding (and logging a
/// warning) whenever the declared encoding cannot represent the value.
pub async fn encode_final<T: Serialize>(result: &FinalResult<'_, T>, output_type: OutputType, logger: &Logger) -> Result<Vec<u8>, flame_serialization::SerializationError> {
    let direct = match (output_type, result) {
        (OutputType::Str, FinalResult::Str(s)) => Some(s.clone().into_bytes()),
        (OutputType::Str, FinalResult::Object(value)) => serde_json::to_string(value).ok().map(String::into_bytes),
        (OutputType::Str, FinalResult::Bytes(b)) => String::from_utf8(b.clone()).ok().map(String::into_bytes),
        (OutputType::Bytes, FinalResult::Bytes(b)) => Some(b.clone()),
        (OutputType::Bytes, FinalResult::Str(s)) => Some(s.clone().into_bytes()),
        (OutputType::Bytes, FinalResult::Object(_)) => None,
    };

    match direct {
        Some(bytes) => Ok(bytes),
        None => {
            logger.log(format!("final result could not be encoded as {output_type:?}, falling back to self-describing serialization"), "warn").await;
            encode_pickled(result)
        }
    }
}

/// Extracts a finite numeric value from a `final` result for local
/// differential privacy validation (spec.md §4.4: "non-numeric or
/// non-finite results with DP requested fail before transmission").
pub fn numeric_value<T: Serialize>(result: &FinalResult<'_, T>) -> Option<f64> {
    match result {
        FinalResult::Str(s) => s.trim().parse::<f64>().ok(),
        FinalResult::Bytes(_) => None,
        FinalResult::Object(value) => serde_json::to_value(value).ok().and_then(|v| v.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_value_parses_string_results() {
        let result: FinalResult<'_, ()> = FinalResult::Str("3.5".to_string());
        assert_eq!(numeric_value(&result), Some(3.5));
    }

    #[test]
    fn numeric_value_rejects_bytes() {
        let result: FinalResult<'_, ()> = FinalResult::Bytes(vec![1, 2, 3]);
        assert_eq!(numeric_value(&result), None);
    }

    #[test]
    fn numeric_value_reads_through_serializable_objects() {
        let value = 42.0_f64;
        let result = FinalResult::Object(&value);
        assert_eq!(numeric_value(&result), Some(42.0));
    }
}
