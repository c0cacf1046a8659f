// [libs/infra/serialization/src/lib.rs]
/*!
 * APARATO: CODIFICACION AUTODESCRIPTIVA (V1.0 - SIN ESQUEMA EXTERNO)
 * CLASIFICACIÓN: ADAPTADOR DE INFRAESTRUCTURA (ESTRATO L3)
 * RESPONSABILIDAD: RONDA COMPLETA VIA BINCODE PARA CUALQUIER VALOR
 *
 * Codificacion de respaldo para el bucket `final`, y la unica usada
 * para artefactos `intermediate`/`local`.
 */

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Packets above this size are refused before attempting to encode —
/// guards against a single oversized analysis result exhausting the
/// node's memory during serialization.
pub const MAX_ARTIFACT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("encoding failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("artifact of {size} bytes exceeds the {MAX_ARTIFACT_BYTES} byte limit")]
    TooLarge { size: usize },
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let bytes = bincode::serialize(value)?;
    if bytes.len() > MAX_ARTIFACT_BYTES {
        return Err(SerializationError::TooLarge { size: bytes.len() });
    }
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        total: u64,
        label: String,
    }

    #[test]
    fn round_trips_arbitrary_values() {
        let value = Sample { total: 42, label: "w".into() };
        let bytes = encode(&value).unwrap();
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn rejects_oversized_payloads() {
        let huge = vec![0u8; MAX_ARTIFACT_BYTES + 1];
        let err = encode(&huge).unwrap_err();
        assert!(matches!(err, SerializationError::TooLarge { .. }));
    }
}
