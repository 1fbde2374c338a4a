//! # Handler HTTP para Uploads
//! src/upload/handlers.rs
//!
//! `POST /<dir>` con un body `multipart/form-data` guarda el archivo en
//! `<root>/<dir>/`. Siempre responde 200 con una página HTML que dice si
//! el upload funcionó.

use crate::http::path::translate_path;
use crate::http::{escape_html, Request, Response, StatusCode};
use crate::upload::error::UploadError;
use crate::upload::multipart::boundary_from_content_type;
use crate::upload::receiver::{receive_upload, UploadOutcome};
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

/// Handler para POST
///
/// `body` es el reader del socket, posicionado al inicio del body.
pub fn upload_handler<R: BufRead>(req: &Request, body: R, root: &Path) -> Response {
    let result = store_upload(req, body, root);

    match &result {
        Ok(outcome) => info!(
            path = %outcome.path.display(),
            bytes = outcome.bytes_written,
            sha256 = %outcome.sha256,
            "upload stored"
        ),
        Err(e) => warn!(target_path = %req.target(), error = %e, "upload failed"),
    }

    Response::html(StatusCode::Ok, &result_page(&result))
}

fn store_upload<R: BufRead>(req: &Request, body: R, root: &Path) -> Result<UploadOutcome, UploadError> {
    let boundary = req
        .header("Content-Type")
        .and_then(boundary_from_content_type)
        .ok_or_else(|| UploadError::malformed("missing multipart boundary"))?;

    let content_length = req
        .content_length()
        .ok_or_else(|| UploadError::malformed("missing Content-Length"))?;

    let dest_dir = translate_path(root, req.target());
    receive_upload(body, &boundary, content_length, &dest_dir)
}

/// Página de resultado del upload
pub fn result_page(result: &Result<UploadOutcome, UploadError>) -> String {
    let (label, message) = match result {
        Ok(outcome) => (
            "Success:",
            format!(
                "File '{}' upload success! ({} bytes, sha256 {})",
                outcome.path.display(),
                outcome.bytes_written,
                outcome.sha256
            ),
        ),
        Err(e) => ("Failed:", e.to_string()),
    };

    format!(
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 3.2 Final//EN\">\
         <html>\n<title>Upload Result Page</title>\n\
         <body>\n<h1>Upload Result Page</h1>\n\
         <hr>\n\
         <strong>{}</strong>{}\
         </body>\n</html>\n",
        label,
        escape_html(&message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    const HELLO_BODY: &str = "--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nHELLO\r\n--B--\r\n";

    fn post(target: &str, content_type: &str, length: usize) -> Request {
        let head = format!(
            "POST {} HTTP/1.0\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            target, content_type, length
        );
        Request::parse(head.as_bytes()).unwrap()
    }

    fn body_text(response: &Response) -> String {
        String::from_utf8_lossy(response.body()).into_owned()
    }

    #[test]
    fn test_upload_success_page() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("results")).unwrap();

        let req = post("/results/", "multipart/form-data; boundary=B", HELLO_BODY.len());
        let response = upload_handler(&req, Cursor::new(HELLO_BODY), root.path());

        assert_eq!(response.status(), StatusCode::Ok);
        let page = body_text(&response);
        assert!(page.contains("<title>Upload Result Page</title>"));
        assert!(page.contains("<strong>Success:</strong>"));
        assert_eq!(fs::read(root.path().join("results/a.txt")).unwrap(), b"HELLO");
    }

    #[test]
    fn test_missing_boundary_param() {
        let root = tempfile::tempdir().unwrap();

        let req = post("/", "multipart/form-data", HELLO_BODY.len());
        let response = upload_handler(&req, Cursor::new(HELLO_BODY), root.path());

        assert_eq!(response.status(), StatusCode::Ok);
        let page = body_text(&response);
        assert!(page.contains("<strong>Failed:</strong>"));
        assert!(page.contains("boundary"));
        assert!(!root.path().join("a.txt").exists());
    }

    #[test]
    fn test_truncated_upload_reports_failure() {
        let root = tempfile::tempdir().unwrap();
        let partial = &HELLO_BODY[..HELLO_BODY.len() - 9];

        let req = post("/", "multipart/form-data; boundary=B", partial.len());
        let response = upload_handler(&req, Cursor::new(partial), root.path());

        let page = body_text(&response);
        assert!(page.contains("<strong>Failed:</strong>"));
        assert!(page.contains("unexpected end of data"));
    }

    #[test]
    fn test_result_page_escapes_message() {
        let page = result_page(&Err(UploadError::malformed("<script>")));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }
}
