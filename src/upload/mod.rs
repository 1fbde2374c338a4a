//! # Uploads multipart
//! src/upload/mod.rs
//!
//! Los clientes devuelven sus resultados con un POST `multipart/form-data`
//! que lleva un único campo `file`. El body se procesa en streaming, línea
//! a línea, directo al archivo destino.

pub mod error;
pub mod handlers;
pub mod multipart;
pub mod receiver;

pub use error::UploadError;
pub use multipart::{MultipartParser, ParserState, Transition};
pub use receiver::{receive_upload, UploadOutcome};
