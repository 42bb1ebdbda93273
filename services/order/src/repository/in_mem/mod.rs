pub(super) mod catalog;
pub(super) mod identity;
pub(super) mod order;
pub(super) mod subscription;

use std::fmt::Display;
use std::result::Result as DefaultResult;
use std::str::FromStr;

use crate::error::{AppError, AppErrorCode};

// every column is kept as string in the in-memory store, failing to parse a
// column back means the stored row is corrupted
fn parse_column<T>(row: &[String], idx: usize, tbl_label: &str) -> DefaultResult<T, AppError>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    let raw = row.get(idx).ok_or_else(|| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("table:{tbl_label}, missing-column:{idx}")),
    })?;
    raw.parse::<T>().map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("table:{tbl_label}, column:{idx}, {e}")),
    })
}

fn flag_to_column(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn column_to_flag(row: &[String], idx: usize) -> bool {
    row.get(idx).map(|v| v.as_str() == "1").unwrap_or(false)
}
