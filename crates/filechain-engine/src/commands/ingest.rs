//! Text ingestion: split every matching file under a directory into
//! paragraph-packed chunks.
//!
//! Output rows: `key` (file stem), `chunk_index`, `text`, `source_path`.

use filechain_core::errors::{ExError, ExErrorKind, UdfResult};
use filechain_core::model::{DataType, Row, Schema};
use filechain_core::{Plan, Value};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const CHUNKS_STAGE: &str = "text_chunks";

pub fn chunk_schema() -> Schema {
    Schema::new()
        .with_field("key", DataType::Str)
        .with_field("chunk_index", DataType::Int)
        .with_field("text", DataType::Str)
        .with_field("source_path", DataType::Str)
}

/// Pack paragraphs (blank-line separated) into chunks of at most
/// `chunk_size` characters. A paragraph longer than `chunk_size` is split
/// at character boundaries.
pub fn chunk_paragraphs(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    let paragraphs = text
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty());

    for paragraph in paragraphs {
        let pieces = split_chars(&paragraph, chunk_size);
        for piece in pieces {
            let piece_len = piece.chars().count();
            let current_len = current.chars().count();
            if !current.is_empty() && current_len + 1 + piece_len > chunk_size {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_chars(s: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Plan listing `location` (optionally through `glob`) and expanding each
/// file into text chunks.
///
/// # Errors
///
/// `InvalidInput` for a zero chunk size, `InvalidPattern` for a bad glob.
pub fn ingest_plan(location: &str, glob: Option<&str>, chunk_size: usize) -> Result<Plan, ExError> {
    if chunk_size == 0 {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("ingest")
            .with_message("chunk size must be at least 1"));
    }

    let source = match glob {
        Some(pattern) => Plan::from_storage_glob(location, pattern)?,
        None => Plan::from_storage(location),
    };

    Ok(source.expand(CHUNKS_STAGE, chunk_schema(), move |row: &Row, ctx| {
        let file = row
            .get(Schema::FILE_COLUMN)
            .and_then(Value::as_file)
            .ok_or("row has no file column")?;
        let text = ctx.read_to_string(file)?;
        let key = file.stem().to_string();
        let path = file.path.clone();

        let rows: Vec<UdfResult<Row>> = chunk_paragraphs(&text, chunk_size)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                Ok(Row::new()
                    .with("key", key.as_str())
                    .with("chunk_index", i as i64)
                    .with("text", chunk)
                    .with("source_path", path.as_str()))
            })
            .collect();
        Ok(rows)
    }))
}
