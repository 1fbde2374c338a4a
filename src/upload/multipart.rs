//! # Parser multipart línea a línea
//! src/upload/multipart.rs
//!
//! Máquina de estados que consume el body de un `multipart/form-data` de
//! a una línea (o trozo de línea) por vez y decide qué bytes pertenecen
//! al archivo:
//!
//! ```text
//! AwaitingBoundary ──"--B"──▶ AwaitingHeader ──Content-Disposition──▶ AwaitingBody
//!                                                                        │ línea vacía
//!                                                                        ▼
//!                       Done ◀──────"--B"────── Streaming { pending }
//! ```
//!
//! En `Streaming` siempre hay una línea retenida (`pending`): recién al
//! ver la siguiente se sabe si es la última del archivo. Si la siguiente
//! es el boundary, al `pending` se le quita el `\n` (y un `\r` previo),
//! que pertenecen al delimitador y no al contenido. Si un trozo cortado
//! termina en `\r`, ese `\r` pasa al `pending` siguiente por si el `\n`
//! que lo completa llega en el próximo trozo.

use crate::upload::error::UploadError;
use regex::Regex;
use std::sync::OnceLock;

/// Estado del parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    AwaitingBoundary,
    AwaitingHeader,
    /// Headers de la parte hasta la línea vacía
    AwaitingBody,
    Streaming { pending: Option<Vec<u8>> },
    Done,
}

/// Qué hacer con la línea recién consumida
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nada que escribir todavía
    Continue,
    /// Se leyó el filename declarado (sin reducir)
    FileDeclared(String),
    /// Bytes confirmados como contenido del archivo
    Write(Vec<u8>),
    /// Últimos bytes del archivo; el parser queda en `Done`
    Finished(Vec<u8>),
}

pub struct MultipartParser {
    delimiter: Vec<u8>,
    state: ParserState,
    /// El trozo anterior terminó en `\n`
    at_line_start: bool,
}

impl MultipartParser {
    /// `boundary` es el token del `Content-Type`, sin los `--`
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{}", boundary).into_bytes(),
            state: ParserState::AwaitingBoundary,
            at_line_start: true,
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// El header de la parte ya fue leído
    pub fn file_declared(&self) -> bool {
        matches!(
            self.state,
            ParserState::AwaitingBody | ParserState::Streaming { .. } | ParserState::Done
        )
    }

    /// Consume una línea del body
    ///
    /// `line` incluye su terminador. Un trozo sin `\n` final es una línea
    /// larga cortada; el siguiente trozo la continúa y nunca se toma como
    /// boundary.
    pub fn feed(&mut self, line: Vec<u8>) -> Result<Transition, UploadError> {
        let starts_line = self.at_line_start;
        self.at_line_start = line.ends_with(b"\n");
        let is_delimiter = starts_line && line.starts_with(&self.delimiter);

        let state = std::mem::replace(&mut self.state, ParserState::Done);
        let (next, transition) = match state {
            ParserState::AwaitingBoundary => {
                if !is_delimiter {
                    return Err(UploadError::malformed("content does not begin with the boundary"));
                }
                (ParserState::AwaitingHeader, Transition::Continue)
            }

            ParserState::AwaitingHeader => {
                let name = declared_filename(&line)
                    .ok_or_else(|| UploadError::malformed("missing filename"))?;
                (ParserState::AwaitingBody, Transition::FileDeclared(name))
            }

            ParserState::AwaitingBody => {
                if is_delimiter {
                    (ParserState::Done, Transition::Finished(Vec::new()))
                } else if is_blank(&line) {
                    (ParserState::Streaming { pending: None }, Transition::Continue)
                } else {
                    // Content-Type u otro header de la parte
                    (ParserState::AwaitingBody, Transition::Continue)
                }
            }

            ParserState::Streaming { pending } => {
                if is_delimiter {
                    let last = pending.map(strip_line_end).unwrap_or_default();
                    (ParserState::Done, Transition::Finished(last))
                } else {
                    let (transition, line) = match pending {
                        Some(previous) => release(previous, line),
                        None => (Transition::Continue, line),
                    };
                    (ParserState::Streaming { pending: Some(line) }, transition)
                }
            }

            ParserState::Done => (ParserState::Done, Transition::Continue),
        };

        self.state = next;
        Ok(transition)
    }
}

/// Extrae `filename` de `Content-Disposition: form-data; name="file"; filename="..."`
pub fn declared_filename(line: &[u8]) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(r#"(?i)Content-Disposition.*name="file"; filename="([^"]*)""#).ok()
        })
        .as_ref()?;

    let text = String::from_utf8_lossy(line);
    let captured = pattern.captures(&text)?.get(1)?.as_str();
    if captured.is_empty() {
        None
    } else {
        Some(captured.to_string())
    }
}

/// Boundary del header `Content-Type: multipart/form-data; boundary=...`
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mut parts = content_type.split(';');
    let media_type = parts.next()?.trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    parts.find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

/// Confirma `previous` como contenido y arma el nuevo `pending`
///
/// Un trozo cortado que termina en `\r` retiene ese `\r`: si el trozo
/// siguiente es `\n` y después llega el boundary, el par es del
/// delimitador.
fn release(mut previous: Vec<u8>, line: Vec<u8>) -> (Transition, Vec<u8>) {
    if previous.last() == Some(&b'\r') {
        previous.pop();
        let mut held = Vec::with_capacity(line.len() + 1);
        held.push(b'\r');
        held.extend_from_slice(&line);
        (Transition::Write(previous), held)
    } else {
        (Transition::Write(previous), line)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Quita `\n` final y, si queda, un `\r`
fn strip_line_end(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    line
}
