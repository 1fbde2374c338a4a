//! # Comandos Básicos
//! src/commands/basic.rs
//!
//! - /info: diagnóstico de la conexión y del request
//! - HEAD sobre cualquier path

use crate::http::{escape_html, Request, Response, StatusCode};

/// Versión del servidor reportada en `/info` y en el header `Server`
pub const SERVER_VERSION: &str = concat!("dataserver/", env!("CARGO_PKG_VERSION"));

/// Plataforma en la que corre el servidor
pub fn sys_version() -> String {
    format!("Rust ({} {})", std::env::consts::OS, std::env::consts::ARCH)
}

/// Handler para /info
///
/// Tabla HTML con los datos de la conexión: dirección del cliente,
/// método, headers, path, versión del servidor y del sistema.
pub fn info_handler(req: &Request, peer_addr: &str) -> Response {
    let headers = req
        .headers()
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n");

    let rows = [
        ("client_address", peer_addr.to_string()),
        ("command", req.method().as_str().to_string()),
        ("headers", headers),
        ("path", req.target().to_string()),
        ("server_version", SERVER_VERSION.to_string()),
        ("sys_version", sys_version()),
    ];

    let mut body = String::from("<html><head><title>Server Info</title></head><body><table><tbody>");
    for (name, value) in rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td><pre>{}</pre></td></tr>",
            name,
            escape_html(&value)
        ));
    }
    body.push_str("</tbody></table></body></html>");

    Response::html(StatusCode::Ok, &body)
}

/// Handler para HEAD: 200 `text/html` sin body
pub fn head_handler(_req: &Request) -> Response {
    Response::new(StatusCode::Ok)
        .with_header("Content-Type", "text/html")
        .with_header("Content-Length", "0")
}
