//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser de la cabecera de un request HTTP/1.0 (acepta también HTTP/1.1).
//!
//! ## Formato
//!
//! ```text
//! GET /end_task?task_id=QDTsrv_20240101-120000 HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! La cabecera se lee línea por línea desde un `BufRead`. El body NO se
//! consume: queda en el reader para que el parser de multipart lo lea en
//! streaming.

use std::collections::HashMap;
use std::io::{BufRead, Read};
use thiserror::Error;

/// Longitud máxima de una línea de cabecera
const MAX_LINE_LEN: usize = 8 * 1024;

/// Número máximo de headers aceptados
const MAX_HEADERS: usize = 100;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// POST - Enviar datos (uploads)
    POST,
}

impl Method {
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// Request truncado antes de la línea vacía
    #[error("Incomplete HTTP request")]
    IncompleteRequest,

    /// Formato inválido de la request line
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Método HTTP no soportado
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Versión HTTP no soportada
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    /// Header malformado
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Línea o cantidad de headers por encima del límite
    #[error("Request head too large")]
    HeadTooLarge,

    /// Conexión cerrada sin enviar nada
    #[error("Empty request")]
    EmptyRequest,

    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

/// Representa la cabecera de un request HTTP parseada
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP (GET, HEAD, POST)
    method: Method,

    /// Target tal como llegó (ej: "/end_task?task_id=abc")
    target: String,

    /// Path de la petición, sin query (ej: "/end_task")
    path: String,

    /// Query parameters decodificados
    query_params: HashMap<String, String>,

    /// Headers en orden de llegada
    headers: Vec<(String, String)>,

    /// Versión HTTP
    version: String,
}

impl Request {
    /// Parsea la cabecera de un request desde bytes completos
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use dataserver::http::Request;
    ///
    /// let raw = b"GET /end_task?task_id=QDTsrv_1 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/end_task");
    /// assert_eq!(request.query_param("task_id"), Some("QDTsrv_1"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let mut reader = buffer;
        Self::read_head(&mut reader)
    }

    /// Lee la request line y los headers desde un reader
    ///
    /// Se detiene en la línea vacía; lo que venga después (body) queda
    /// sin leer en `reader`.
    pub fn read_head<R: BufRead>(reader: &mut R) -> Result<Self, ParseError> {
        // 1. Request line
        let first = match read_head_line(reader)? {
            Some(line) => line,
            None => return Err(ParseError::EmptyRequest),
        };
        if first.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }
        let (method, target, version) = Self::parse_request_line(&first)?;

        // 2. Headers hasta la línea vacía
        let mut headers = Vec::new();
        loop {
            let line = match read_head_line(reader)? {
                Some(line) => line,
                // HTTP/0.9-style: request line sin headers ni línea vacía
                None if headers.is_empty() => break,
                None => return Err(ParseError::IncompleteRequest),
            };
            if line.is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(ParseError::HeadTooLarge);
            }
            headers.push(Self::parse_header(&line)?);
        }

        let (path, query_params) = Self::parse_path_and_query(&target);

        Ok(Request {
            method,
            target,
            path,
            query_params,
            headers,
            version,
        })
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_str(parts[0])?;

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, parts[1].to_string(), version))
    }

    fn parse_header(line: &str) -> Result<(String, String), ParseError> {
        match line.find(':') {
            Some(colon_pos) => {
                let name = line[..colon_pos].trim().to_string();
                let value = line[colon_pos + 1..].trim().to_string();
                if name.is_empty() {
                    return Err(ParseError::InvalidHeader(line.to_string()));
                }
                Ok((name, value))
            }
            None => Err(ParseError::InvalidHeader(line.to_string())),
        }
    }

    /// Separa path y query, descartando el fragmento
    ///
    /// Ejemplo: "/end_task?task_id=abc#x" → ("/end_task", {"task_id": "abc"})
    fn parse_path_and_query(target: &str) -> (String, HashMap<String, String>) {
        let target = target.split('#').next().unwrap_or("");
        match target.split_once('?') {
            Some((path, query)) => (percent_decode(path), Self::parse_query_string(query)),
            None => (percent_decode(target), HashMap::new()),
        }
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for param in query.split('&') {
            if param.is_empty() {
                continue;
            }

            match param.split_once('=') {
                Some((key, value)) => {
                    params.insert(url_decode(key), url_decode(value));
                }
                // Parámetro sin valor (ej: "?debug")
                None => {
                    params.insert(url_decode(param), String::new());
                }
            }
        }

        params
    }

    // === Accesores ===

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target original, con query string
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path decodificado, sin query
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use dataserver::http::Request;
    ///
    /// let raw = b"GET /test?num=42 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Headers en orden de llegada
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Busca un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `Content-Length` declarado, si es un número válido
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")?.trim().parse().ok()
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Lee una línea de cabecera sin el terminador `\r\n`
///
/// Retorna `None` en EOF.
fn read_head_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ParseError> {
    let mut buf = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(ParseError::HeadTooLarge);
    }
    if buf.last() != Some(&b'\n') && !buf.is_empty() {
        // Sin terminador: solo aceptable al final del stream
        let line = String::from_utf8(buf).map_err(|_| ParseError::InvalidRequestLine)?;
        return Ok(Some(line));
    }
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    let line = String::from_utf8(buf).map_err(|_| ParseError::InvalidRequestLine)?;
    Ok(Some(line))
}

/// Decodifica `%XX` y `+` en un componente de query string
///
/// Secuencias `%` inválidas se dejan tal cual.
pub fn url_decode(s: &str) -> String {
    decode(s, true)
}

/// Decodifica solo `%XX` (paths: `+` es un caracter literal)
pub fn percent_decode(s: &str) -> String {
    decode(s, false)
}

fn decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
