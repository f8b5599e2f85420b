#[cfg(test)]
mod tests;

use crate::RagError;
use crate::database::{Predicate, Record, SearchResult, VectorRecordStore};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "vectors";

/// Vector record store backed by a LanceDB table
pub struct LanceRecordStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

impl LanceRecordStore {
    /// Open (or create) the store at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the LanceDB dataset
    /// * `dimension` - Vector length for every record in the store
    ///
    /// # Returns
    /// * `Result<Self, RagError>` - The opened store, or an error if the
    ///   existing table was created with a different dimension
    #[inline]
    pub async fn open(db_path: &Path, dimension: usize) -> Result<Self, RagError> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = db_path.to_string_lossy().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension,
        };

        store.initialize_table().await?;

        info!("Vector store initialized with {} dimensions", dimension);
        Ok(store)
    }

    /// Create the table by inserting the sentinel record, or verify the
    /// dimension of an existing one
    async fn initialize_table(&self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            let existing = self.detect_existing_vector_dimension().await?;
            if existing != self.dimension {
                return Err(RagError::Database(format!(
                    "Existing vector table has dimension {} but {} was configured",
                    existing, self.dimension
                )));
            }
            debug!("Vector table already exists with {} dimensions", existing);
            return Ok(());
        }

        info!("Creating vector table with sentinel record");
        let batch = self.create_record_batch(&[Record::sentinel(self.dimension)])?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        self.connection
            .create_table(&self.table_name, reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, RagError> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    async fn open_table(&self) -> Result<Table, RagError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("filepath", DataType::Utf8, false),
        ]))
    }

    /// Create a RecordBatch from records, rejecting wrong-sized vectors
    fn create_record_batch(&self, records: &[Record]) -> Result<RecordBatch, RagError> {
        let len = records.len();
        let vector_dim = self.dimension;

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        let mut texts = Vec::with_capacity(len);
        let mut filepaths = Vec::with_capacity(len);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(RagError::Database(format!(
                    "Record {} has {} dimensions, store expects {}",
                    record.id,
                    record.vector.len(),
                    vector_dim
                )));
            }
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            texts.push(record.text.as_str());
            filepaths.push(record.filepath.as_str());
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    RagError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(filepaths)),
        ];

        RecordBatch::try_new(Self::create_schema(vector_dim), arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Collect a result stream into records, keeping `_distance` when present
    async fn collect_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<(Record, Option<f32>)>, RagError> {
        let mut rows = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            rows.extend(Self::parse_batch(&batch)?);
        }

        Ok(rows)
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, RagError> {
        batch
            .column_by_name(name)
            .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
    }

    /// Parse a single record batch
    fn parse_batch(batch: &RecordBatch) -> Result<Vec<(Record, Option<f32>)>, RagError> {
        let ids = Self::string_column(batch, "id")?;
        let texts = Self::string_column(batch, "text")?;
        let filepaths = Self::string_column(batch, "filepath")?;

        let vectors = batch
            .column_by_name("vector")
            .ok_or_else(|| RagError::Database("Missing vector column".to_string()))?
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| RagError::Database("Invalid vector column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut rows = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let values = vectors.value(row);
            let vector = values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| RagError::Database("Invalid vector item type".to_string()))?
                .values()
                .to_vec();

            let distance = distances.and_then(|d| (!d.is_null(row)).then(|| d.value(row)));

            rows.push((
                Record {
                    id: ids.value(row).to_string(),
                    vector,
                    text: texts.value(row).to_string(),
                    filepath: filepaths.value(row).to_string(),
                },
                distance,
            ));
        }

        Ok(rows)
    }
}

#[async_trait]
impl VectorRecordStore for LanceRecordStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    async fn add(&self, records: Vec<Record>) -> Result<(), RagError> {
        if records.is_empty() {
            debug!("No records to store");
            return Ok(());
        }

        let record_batch = self.create_record_batch(&records)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert records: {}", e)))?;

        debug!("Stored {} records", records.len());
        Ok(())
    }

    #[inline]
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, RagError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let results = self
            .open_table()
            .await?
            .vector_search(vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut hits: Vec<SearchResult> = Self::collect_stream(results)
            .await?
            .into_iter()
            .map(|(record, distance)| SearchResult {
                record,
                distance: distance.unwrap_or(f32::MAX),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(hits)
    }

    #[inline]
    async fn scan(&self) -> Result<Vec<Record>, RagError> {
        let table = self.open_table().await?;

        let total = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))?;

        let results = table
            .query()
            .limit(total.max(1))
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to scan table: {}", e)))?;

        let records: Vec<Record> = Self::collect_stream(results)
            .await?
            .into_iter()
            .map(|(record, _)| record)
            .collect();

        debug!("Scanned {} records", records.len());
        Ok(records)
    }

    #[inline]
    async fn delete(&self, predicate: &Predicate) -> Result<(), RagError> {
        let filter = predicate.to_filter();
        debug!("Deleting records where {}", filter);

        self.open_table()
            .await?
            .delete(&filter)
            .await
            .map_err(|e| RagError::Database(format!("Failed to delete records: {}", e)))?;

        Ok(())
    }

    #[inline]
    async fn count(&self) -> Result<usize, RagError> {
        self.open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }

    #[inline]
    async fn optimize(&self) -> Result<(), RagError> {
        debug!("Optimizing vector database");

        self.open_table()
            .await?
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| RagError::Database(format!("Failed to optimize table: {}", e)))?;

        info!("Vector database optimization completed");
        Ok(())
    }
}
