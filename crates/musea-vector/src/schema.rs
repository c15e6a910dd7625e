use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Chunk table layout. `dim` is fixed per collection; it comes from the
/// embedding provider the collection was created with.
pub fn build_chunks_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source_id", DataType::Utf8, false),
        Field::new("origin", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        // Attribute map carried as JSON text; filtered in memory, not in SQL.
        Field::new("attrs", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}

/// Key/value meta table used for collection-level pointers such as the
/// pinned embedding space.
pub fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new(
            "updated_at",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
    ]))
}
