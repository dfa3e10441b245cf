//! Historical customer corpus: source adapters, normalization, aggregation.

pub mod aggregator;
pub mod document;
pub mod records;
pub mod sources;
pub mod tabular;

pub use aggregator::{aggregate, Corpus, CorpusStats, IndustryCount};
pub use records::{DocumentRecord, FormRecord, SourceRecord, TabularRecord};
pub use sources::{
    discover_sources, CsvFileSource, DocumentDirectorySource, HistoricalSource, JsonFormSource,
    StaticSource,
};
