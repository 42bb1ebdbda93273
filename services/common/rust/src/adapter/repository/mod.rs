use std::result::Result;

use crate::error::AppErrorCode;
use crate::util::{hex_to_octet, octet_to_hex};

pub const UID_BYTE_LENGTH: usize = 16;

/// Binary form of the 16-octet identifiers (orders, subscriptions) stored in
/// `BINARY(16)` columns. The application side always keeps them as 32-char
/// lowercase hex strings.
pub struct UidBytes(pub [u8; UID_BYTE_LENGTH]);

impl<'a> TryFrom<&'a str> for UidBytes {
    type Error = (AppErrorCode, String);
    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        if value.len() != (UID_BYTE_LENGTH << 1) {
            let detail = format!("uid-size-not-fit: {value}");
            return Err((AppErrorCode::InvalidInput, detail));
        }
        let src = hex_to_octet(value)?;
        let mut dst = [0u8; UID_BYTE_LENGTH];
        dst.copy_from_slice(&src);
        Ok(UidBytes(dst))
    }
}

impl UidBytes {
    pub fn as_column(&self) -> Vec<u8> {
        self.0.to_vec()
    }
    pub fn to_app_uid(raw: Vec<u8>) -> Result<String, (AppErrorCode, String)> {
        if raw.len() == UID_BYTE_LENGTH {
            Ok(octet_to_hex(&raw))
        } else {
            let detail = format!("fetched-id-len: {}", raw.len());
            Err((AppErrorCode::DataCorruption, detail))
        }
    }
}
