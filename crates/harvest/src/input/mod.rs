//! Raw CSV ingestion.

mod parser;
mod source;

pub use parser::{DEFAULT_ENCODINGS, Loader, LoaderConfig};
pub use source::{RawTable, SourceMetadata};
