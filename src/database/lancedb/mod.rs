// LanceDB vector database module
// Persists records and answers nearest-neighbour queries

pub mod vector_store;

pub use vector_store::LanceRecordStore;
