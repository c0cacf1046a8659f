// INICIO DEL ARCHIVO [libs/shared/telemetry/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRIA COMPARTIDA (V1.0 - VOZ DEL NODO)
 * CLASIFICACIÓN: INFRAESTRUCTURA COMPARTIDA (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO, PROGRESO Y STREAMING DE OBSERVABILIDAD
 *
 * VISION HIPER-HOLÍSTICA:
 * Unico escritor del estado de ejecucion que `/healthz` reporta —
 * `Logger` es la fuente de verdad para `RunState` y el contador de
 * progreso, con reenvio opcional hacia el observability-proxy.
 * =================================================================
 */

pub mod init;
pub mod logger;
pub mod observability;
pub mod record;
pub mod severity;

pub use init::init_tracing;
pub use logger::{Logger, LoggerError};
pub use observability::{ObservabilityClient, ObservabilityError};
pub use record::LogRecord;
pub use severity::Severity;
// FIN DEL ARCHIVO [libs/shared/telemetry/src/lib.rs]
