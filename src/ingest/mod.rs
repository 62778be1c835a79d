//! Batch ingestion of uploaded artifacts.
//!
//! An upload moves through four stages:
//!
//! 1. **Artifact**: detect JSON or CSV by extension and decode to items
//! 2. **Guard**: reject experiment-keyed batches whose experiment already exists
//! 3. **Resolve**: find each item's reference answer
//! 4. **Grade + persist**: score sequentially, then write to the ledger
//!
//! ```text
//! upload → Artifact → [guard] → resolve → Grader → Ledger
//!                                   ↓
//!                             IngestReport
//! ```

pub mod artifact;
pub mod batch;
pub mod resolve;

pub use artifact::{Artifact, BatchItem, SourceDocument, Sources};
pub use batch::{IngestReport, Ingestor, ItemOutcome, DEFAULT_PROJECT};
pub use resolve::{Reference, ReferenceStrategy};
