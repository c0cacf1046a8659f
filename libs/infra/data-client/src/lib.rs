// [libs/infra/data-client/src/lib.rs]
//! The data client (C4): FHIR and object data through the data proxy.
//! Cliente de datos — FHIR y objetos via el proxy Kong, con token propio.

pub mod client;
pub mod errors;
pub mod s3;

pub use client::{DataClient, DataSourceHandle};
pub use errors::DataError;
