use serde::Serialize;

use crate::error::ClientError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
