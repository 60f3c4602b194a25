//! Document vector corpus: persisted records and the embedding matrix
//! built from them.

mod matrix;
mod reader;
mod record;

pub use matrix::EmbeddingMatrix;
pub use reader::load_document_vectors;
pub use record::{DocumentMetadata, DocumentVector, TextData, VECTOR_FILE_SUFFIX, VectorPayload};
