//! # Archivo FITS de relleno
//! src/tasks/placeholder.rs
//!
//! En modo sintético cada nombre generado se respalda con un archivo FITS
//! real y mínimo: un HDU primario con 100 valores `f64` (0.0 .. 99.0).
//!
//! ```text
//! [ cabecera: tarjetas de 80 chars, 2880 bytes ]
//! [ datos: 100 x f64 big-endian = 800 bytes, rellenado a 2880 ]
//! ```

use std::fs;
use std::io;
use std::path::Path;

/// Tamaño de bloque FITS
pub const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;
/// Número de valores en el array de datos
pub const VALUE_COUNT: usize = 100;

/// Construye el contenido completo del archivo
pub fn placeholder_bytes() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BLOCK_SIZE * 2);

    for card in [
        value_card("SIMPLE", "T"),
        value_card("BITPIX", "-64"),
        value_card("NAXIS", "1"),
        value_card("NAXIS1", &VALUE_COUNT.to_string()),
        value_card("EXTEND", "T"),
        pad_card("END"),
    ] {
        bytes.extend_from_slice(card.as_bytes());
    }
    pad_block(&mut bytes, b' ');

    for i in 0..VALUE_COUNT {
        bytes.extend_from_slice(&(i as f64).to_be_bytes());
    }
    pad_block(&mut bytes, 0);

    bytes
}

/// Escribe el archivo de relleno en `path`
pub fn write_placeholder(path: &Path) -> io::Result<()> {
    fs::write(path, placeholder_bytes())
}

/// `KEYWORD = value` con el valor alineado a la derecha en la columna 30
fn value_card(keyword: &str, value: &str) -> String {
    pad_card(&format!("{:<8}= {:>20}", keyword, value))
}

fn pad_card(text: &str) -> String {
    format!("{:<width$}", text, width = CARD_SIZE)
}

fn pad_block(bytes: &mut Vec<u8>, fill: u8) {
    let rem = bytes.len() % BLOCK_SIZE;
    if rem != 0 {
        bytes.resize(bytes.len() + BLOCK_SIZE - rem, fill);
    }
}
