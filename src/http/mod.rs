//! # Módulo HTTP
//!
//! Implementación mínima de HTTP/1.0 hecha a mano:
//!
//! - Lectura de la cabecera del request desde un `BufRead` (el body queda
//!   en el reader para los uploads)
//! - Construcción de responses
//! - Códigos de estado
//! - Traducción de paths de URL al filesystem
//!
//! ### Formato de Request
//!
//! ```text
//! GET /get_task HTTP/1.0\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```

pub mod path;
pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::{escape_html, Response};
pub use status::StatusCode;
