use shared::error::{AppError, AppResult};
use std::str::FromStr;

pub mod access_event;
pub mod amenity;
pub mod authorization;
pub mod config;
pub mod reservation;
pub mod resident;

// 文字列で保存している列挙型を読み戻す
pub(crate) fn parse_column<T: FromStr>(column: &str, value: &str) -> AppResult<T> {
    value.parse().map_err(|_| {
        AppError::ConversionEntityError(format!("{column} に不正な値があります: {value}"))
    })
}
