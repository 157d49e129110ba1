//! Chunk documents, embed the chunks with a toy encoder and rank them
//! against a query, then save the result as a versioned dataset.
//!
//! Run with `cargo run -p filechain-core --example pdf_chunks_demo`.

use filechain_core::errors::{ExError, UdfResult};
use filechain_core::logging_facility::{init, Profile};
use filechain_core::model::{DataType, Row, Schema};
use filechain_core::registry::{InMemoryRegistry, VersionRegistry};
use filechain_core::storage::MemoryStorage;
use filechain_core::{col, Executor, ExecutorConfig, Plan, Value};
use std::sync::Arc;

const DIMS: usize = 16;

/// Bag-of-bytes embedding, normalized to unit length.
fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0f32; DIMS];
    for b in text.bytes().filter(u8::is_ascii_alphabetic) {
        v[(b.to_ascii_lowercase() as usize) % DIMS] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn main() -> Result<(), ExError> {
    init(Profile::Development);

    let storage = MemoryStorage::new();
    storage.put(
        "papers",
        "neurips/attention.pdf",
        "Attention lets a model weigh tokens.\n\nTransformers stack attention layers.",
    );
    storage.put(
        "papers",
        "neurips/diffusion.pdf",
        "Diffusion models denoise step by step.\n\nSampling is slow but the images are sharp.",
    );
    storage.put("papers", "README.txt", "not a paper");

    let exec = Executor::new(Arc::new(storage), ExecutorConfig::default())?;
    let registry = InMemoryRegistry::new();

    let chunk_schema = Schema::new()
        .with_field("key", DataType::Str)
        .with_field("text", DataType::Str)
        .with_field("embeddings", DataType::Vector);

    let chunks = Plan::from_storage("mem://papers")
        .filter(col("file.path")?.glob("*.pdf")?)
        .expand("pdf_chunks", chunk_schema, |row, ctx| {
            let file = row
                .get("file")
                .and_then(Value::as_file)
                .ok_or("row has no file column")?;
            let key = file.stem().to_string();
            let text = ctx.read_to_string(file)?;
            let rows: Vec<UdfResult<Row>> = text
                .split("\n\n")
                .filter(|p| !p.trim().is_empty())
                .map(|p| {
                    Ok(Row::new()
                        .with("key", key.as_str())
                        .with("text", p.trim())
                        .with("embeddings", embed(p)))
                })
                .collect();
            Ok(rows)
        });

    let info = chunks.save(&exec, &registry, "chunks")?;
    println!("saved {}@{} ({} rows)", info.dataset_name, info.version, info.row_count);

    let ranked = chunks
        .mutate(
            "similarity_score",
            col("embeddings")?.cosine_similarity(embed("attention transformers")),
        )?
        .order_by("similarity_score", true)?;
    println!("{}", ranked.show(&exec, 3)?);

    let latest = registry.load("chunks", None)?;
    println!("latest version {} has digest {}", latest.version, latest.content_digest);
    Ok(())
}
