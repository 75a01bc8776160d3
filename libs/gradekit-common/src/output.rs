use crate::types::GradingResult;
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Output semantics - defines only the transport contract, not the pipeline.
/// Keeps the runner and anything decoding its output in agreement on
/// the key name and the encoding.

pub const RESULT_OUTPUT_KEY: &str = "result";

/// Encode a result as base64 of its compact JSON form
pub fn encode_result(result: &GradingResult) -> Result<String> {
    let json = serde_json::to_string(result).context("Failed to serialize grading result")?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// Reverse of `encode_result`
pub fn decode_result(encoded: &str) -> Result<GradingResult> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .context("Result is not valid base64")?;
    serde_json::from_slice(&bytes).context("Result is not a valid grading result")
}

/// `key=value` line for the actions output-file protocol
pub fn output_line(encoded: &str) -> String {
    format!("{}={}", RESULT_OUTPUT_KEY, encoded)
}

/// Append the encoded result to an actions output file
pub fn append_output(path: &Path, encoded: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file {}", path.display()))?;

    writeln!(file, "{}", output_line(encoded))
        .with_context(|| format!("Failed to write output file {}", path.display()))?;

    Ok(())
}
