//! Traducción de paths de URL a rutas bajo la raíz del servidor

use super::request::percent_decode;
use std::path::{Path, PathBuf};

/// Traduce el path de un request a una ruta bajo `root`
///
/// Se descartan query string, fragmento y los componentes vacíos, `.` y
/// `..`, de modo que el resultado nunca sale de `root`.
///
/// ```
/// use dataserver::http::path::translate_path;
/// use std::path::Path;
///
/// let path = translate_path(Path::new("/srv"), "/a/../b/./c.txt?x=1");
/// assert_eq!(path, Path::new("/srv/a/b/c.txt"));
/// ```
pub fn translate_path(root: &Path, target: &str) -> PathBuf {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    let decoded = percent_decode(&target[..end]);

    let mut path = root.to_path_buf();
    for component in decoded.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            continue;
        }
        path.push(component);
    }
    path
}

/// Último componente de un nombre de archivo enviado por el cliente
///
/// Retorna `None` si no queda un nombre utilizable.
pub fn final_component(name: &str) -> Option<&str> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last)
    }
}
