//! # Recepción de Uploads
//! src/upload/receiver.rs
//!
//! Lee el body de un POST multipart desde el socket, limitado a
//! `Content-Length`, y lo pasa por el `MultipartParser` escribiendo el
//! archivo a medida que llega. Nunca se guarda el body completo en
//! memoria: cada lectura toma a lo sumo `MAX_CHUNK` bytes.

use crate::http::path::final_component;
use crate::upload::error::UploadError;
use crate::upload::multipart::{MultipartParser, Transition};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tamaño máximo de cada trozo de línea leído del body
pub const MAX_CHUNK: u64 = 64 * 1024;

/// Resultado de un upload exitoso
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// SHA-256 del contenido guardado, en hex
    pub sha256: String,
}

/// Archivo destino abierto, con su digest en curso
struct UploadSink {
    path: PathBuf,
    writer: BufWriter<File>,
    hasher: Sha256,
    written: u64,
}

impl UploadSink {
    fn create(path: PathBuf) -> Result<Self, UploadError> {
        let file = File::create(&path).map_err(|e| {
            UploadError::io(
                format!("cannot create {} (is the directory writable?)", path.display()),
                e,
            )
        })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            hasher: Sha256::new(),
            written: 0,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), UploadError> {
        self.writer
            .write_all(bytes)
            .map_err(|e| UploadError::io(format!("cannot write {}", self.path.display()), e))?;
        self.hasher.update(bytes);
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<UploadOutcome, UploadError> {
        self.writer
            .flush()
            .map_err(|e| UploadError::io(format!("cannot write {}", self.path.display()), e))?;

        Ok(UploadOutcome {
            path: self.path,
            bytes_written: self.written,
            sha256: format!("{:x}", self.hasher.finalize()),
        })
    }

    /// Borra el archivo parcial
    fn discard(self) {
        let UploadSink { path, writer, .. } = self;
        drop(writer);
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "cannot remove partial upload");
        }
    }
}

/// Recibe un único archivo multipart y lo guarda en `dest_dir`
///
/// El nombre del archivo es el `filename` declarado, reducido a su último
/// componente. Si el body termina antes del boundary final, el archivo
/// parcial se borra y se retorna `TruncatedBody`.
pub fn receive_upload<R: BufRead>(
    reader: R,
    boundary: &str,
    content_length: u64,
    dest_dir: &Path,
) -> Result<UploadOutcome, UploadError> {
    let mut body = reader.take(content_length);
    let mut parser = MultipartParser::new(boundary);
    let mut sink: Option<UploadSink> = None;

    let result = loop {
        let mut line = Vec::new();
        let n = match body.by_ref().take(MAX_CHUNK).read_until(b'\n', &mut line) {
            Ok(n) => n,
            Err(e) => break Err(UploadError::io("cannot read request body", e)),
        };

        if n == 0 {
            break Err(if parser.file_declared() {
                UploadError::TruncatedBody
            } else {
                UploadError::malformed("body ended before the part header")
            });
        }

        let transition = match parser.feed(line) {
            Ok(t) => t,
            Err(e) => break Err(e),
        };

        match transition {
            Transition::Continue => {}
            Transition::FileDeclared(declared) => {
                let name = match final_component(&declared) {
                    Some(name) => name,
                    None => break Err(UploadError::malformed("missing filename")),
                };
                let path = dest_dir.join(name);
                debug!(declared = %declared, path = %path.display(), "upload destination");
                match UploadSink::create(path) {
                    Ok(s) => sink = Some(s),
                    Err(e) => break Err(e),
                }
            }
            Transition::Write(bytes) => {
                if let Some(s) = sink.as_mut() {
                    if let Err(e) = s.write(&bytes) {
                        break Err(e);
                    }
                }
            }
            Transition::Finished(bytes) => {
                let Some(mut s) = sink.take() else {
                    break Err(UploadError::malformed("missing filename"));
                };
                if let Err(e) = s.write(&bytes) {
                    sink = Some(s);
                    break Err(e);
                }
                break s.finish();
            }
        }
    };

    if result.is_err() {
        if let Some(s) = sink {
            s.discard();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HELLO_BODY: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nHELLO\r\n--B--\r\n";

    fn receive(body: &[u8], dir: &Path) -> Result<UploadOutcome, UploadError> {
        receive_upload(Cursor::new(body.to_vec()), "B", body.len() as u64, dir)
    }

    #[test]
    fn test_hello_upload() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = receive(HELLO_BODY, dir.path()).unwrap();

        assert_eq!(outcome.path, dir.path().join("a.txt"));
        assert_eq!(outcome.bytes_written, 5);
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"HELLO");
        // sha256("HELLO")
        assert_eq!(
            outcome.sha256,
            "3733cd977ff8eb18b987357e22ced99f46097f31ecb239e878ae63760e83e4d5"
        );
    }

    #[test]
    fn test_missing_boundary_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"HELLO\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nx\r\n--B--\r\n";

        let err = receive(body, dir.path()).unwrap_err();
        assert!(matches!(err, UploadError::MalformedBody(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_truncated_body_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nline one\r\nline two\r\n";

        let err = receive(body, dir.path()).unwrap_err();
        assert!(matches!(err, UploadError::TruncatedBody));
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_content_length_limits_the_read() {
        let dir = tempfile::tempdir().unwrap();
        // El boundary final queda fuera del Content-Length declarado
        let cut = HELLO_BODY.len() - "--B--\r\n".len();
        let err = receive_upload(Cursor::new(HELLO_BODY.to_vec()), "B", cut as u64, dir.path())
            .unwrap_err();
        assert!(matches!(err, UploadError::TruncatedBody));
    }

    #[test]
    fn test_filename_reduced_to_final_component() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"../../evil.txt\"\r\n\r\nx\r\n--B--\r\n";

        let outcome = receive(body, dir.path()).unwrap();
        assert_eq!(outcome.path, dir.path().join("evil.txt"));
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");

        let err = receive(HELLO_BODY, &missing).unwrap_err();
        assert!(matches!(err, UploadError::IoFailure { .. }));
    }

    #[test]
    fn test_long_line_without_newline() {
        let dir = tempfile::tempdir().unwrap();
        let payload = vec![b'z'; (MAX_CHUNK as usize) * 2 + 17];

        let mut body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\n\r\n".to_vec();
        body.extend_from_slice(&payload);
        body.extend_from_slice(b"\r\n--B--\r\n");

        let outcome = receive(&body, dir.path()).unwrap();
        assert_eq!(outcome.bytes_written, payload.len() as u64);
        assert_eq!(fs::read(dir.path().join("big.bin")).unwrap(), payload);
    }

    #[test]
    fn test_crlf_on_chunk_edge_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        // El \r queda al final de un trozo y el \n llega solo en el siguiente
        let payload = vec![b'z'; MAX_CHUNK as usize - 1];

        let mut body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"edge.bin\"\r\n\r\n".to_vec();
        body.extend_from_slice(&payload);
        body.extend_from_slice(b"\r\n--B--\r\n");

        let outcome = receive(&body, dir.path()).unwrap();
        assert_eq!(outcome.bytes_written, payload.len() as u64);
        assert_eq!(fs::read(dir.path().join("edge.bin")).unwrap(), payload);
    }
}
