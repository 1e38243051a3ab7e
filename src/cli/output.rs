use anyhow::Result;
use serde_json::Value;
use std::io::Write;

pub fn emit_value(value: &Value, compact: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if compact {
        serde_json::to_writer(&mut handle, value)?;
    } else {
        serde_json::to_writer_pretty(&mut handle, value)?;
    }
    handle.write_all(b"\n")?;
    Ok(())
}

/// Error payload printed on failure, shaped like the HTTP error bodies.
pub fn error_value(error: &anyhow::Error) -> Value {
    serde_json::json!({
        "success": false,
        "error": format!("{error:#}"),
    })
}
