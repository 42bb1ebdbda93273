pub mod adapter;
pub mod confidentiality;
pub mod config;
pub mod constant;
pub mod error;
pub mod logging;

use std::sync::Arc;

pub type WebApiPath = String;
pub(crate) type AppLogAlias = Arc<String>;

pub mod util {
    use crate::error::AppErrorCode;
    use std::result::Result;
    use std::vec::Vec;

    pub fn hex_to_octet(src: &str) -> Result<Vec<u8>, (AppErrorCode, String)> {
        if src.len() % 2 != 0 {
            let detail = format!("hex-string-incorrect-size: {src}");
            return Err((AppErrorCode::InvalidInput, detail));
        }
        (0..src.len())
            .step_by(2)
            .map(|idx| match src.get(idx..idx + 2) {
                Some(hx) => u8::from_str_radix(hx, 16).map_err(|_e| {
                    let detail = format!("parse-char-at-idx: {hx} , {idx}");
                    (AppErrorCode::InvalidInput, detail)
                }),
                None => {
                    let detail = format!("no-chars-at-idx: {idx}");
                    Err((AppErrorCode::InvalidInput, detail))
                }
            })
            .collect()
    } // end of fn hex_to_octet

    pub fn octet_to_hex(src: &[u8]) -> String {
        src.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
