//! # Archivos Estáticos
//! src/commands/files.rs
//!
//! Cualquier GET que no sea un endpoint conocido se resuelve contra la
//! raíz del servidor. Los directorios se sirven por su `index.html` o
//! `index.htm`; si no hay archivo, se responde una página 500 genérica.

use crate::http::path::translate_path;
use crate::http::{escape_html, Request, Response, StatusCode};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Content-Type según la extensión (sin distinguir mayúsculas)
///
/// Extensiones desconocidas se sirven como `text/plain`.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "css" => "text/css",
        "gif" => "image/gif",
        "htm" | "html" => "text/html",
        "jpeg" => "image/jpeg",
        "jpg" => "image/jpg",
        "js" => "text/javascript",
        "png" => "image/png",
        "text" | "txt" => "text/plain",
        "fits" => "application/fits",
        "json" => "application/json",
        _ => "text/plain",
    }
}

/// Archivo a servir para `path`: el mismo, o el índice si es directorio
pub fn resolve_file(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        return INDEX_FILES
            .iter()
            .map(|index| path.join(index))
            .find(|candidate| candidate.is_file());
    }
    if path.is_file() {
        Some(path.to_path_buf())
    } else {
        None
    }
}

/// Handler para GET de archivos bajo `root`
///
/// `delay` simula transferencias lentas antes de enviar el archivo.
pub fn static_file_handler(req: &Request, root: &Path, delay: Duration) -> Response {
    let path = translate_path(root, req.target());
    debug!(file = %path.display(), "static lookup");

    let file = match resolve_file(&path) {
        Some(file) => file,
        None => return access_error(req),
    };

    if !delay.is_zero() {
        thread::sleep(delay);
    }

    match fs::read(&file) {
        Ok(bytes) => Response::new(StatusCode::Ok)
            .with_header("Content-Type", content_type_for(&file))
            .with_body_bytes(bytes),
        Err(e) => {
            warn!(file = %file.display(), error = %e, "cannot read static file");
            access_error(req)
        }
    }
}

/// Página 500 genérica con link de vuelta
fn access_error(req: &Request) -> Response {
    let body = format!(
        "<html>\
         <head><title>Server Access Error</title></head>\
         <body>\
         <p>Server access error.</p>\
         <p>{}</p>\
         <p><a href=\"{}\">Back</a></p>\
         </body>\
         </html>",
        escape_html(req.target()),
        escape_html(req.path())
    );
    Response::html(StatusCode::InternalServerError, &body)
}
