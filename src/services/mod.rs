pub mod aim_extractor;
pub mod cleanup;
pub mod converter;
pub mod document_synthesizer;

pub use aim_extractor::{
    AimExtractor, ExtractedAims, ExtractionRequest, ExtractionStrategy, FreeTextJsonExtraction,
    StructuredExtraction,
};
pub use cleanup::{heading, Cleanup, DEFAULT_DENY_LIST};
pub use converter::{DocumentConverter, PandocConverter};
pub use document_synthesizer::DocumentSynthesizer;
