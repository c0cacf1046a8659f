// INICIO DEL ARCHIVO [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: FLAME DOMAIN MODELS (V1.0 - CIMIENTO)
 * CLASIFICACIÓN: ENTIDADES DE DOMINIO (ESTRATO L2)
 * RESPONSABILIDAD: TIPOS COMPARTIDOS SIN E/S PARA TODO EL NODO
 *
 * VISION HIPER-HOLÍSTICA:
 * Toda otra crate del workspace depende de esta, y ninguno de estos
 * tipos realiza E/S — son datos planos mas la validacion minima que
 * la especificacion trata como invariante, no como asunto de red
 * (formato de tag, forma del campo meta, parseo de rol).
 * =================================================================
 */

pub mod artifact;
pub mod identity;
pub mod message;
pub mod participant;
pub mod status;

pub use artifact::{validate_tag, ArtifactEncoding, ArtifactLocation, DpError, LocalDifferentialPrivacyParams, TagError, TagOption};
pub use identity::{NodeCredentials, NodeIdentity, NodeRole};
pub use message::{Message, MessageDirection, MessageMeta, MessageStatus, RESERVED_META_KEY};
pub use participant::{DataSourceDescriptor, ParticipantInfo, ParticipantSet};
pub use status::{ProgressCounter, RunState};
// FIN DEL ARCHIVO [libs/domain/models/src/lib.rs]
