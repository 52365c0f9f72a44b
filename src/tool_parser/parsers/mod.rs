/// Batch extractors, one per surface syntax
///
/// Each extractor assumes its syntax was already confirmed by the detector.
// Individual parser modules
pub mod bare_json;
pub mod envelope;
pub mod xml_tag;

// Shared helpers and utilities
pub mod helpers;

// Re-export parser types for convenience
pub use bare_json::BareJsonParser;
pub use envelope::EnvelopeParser;
pub use xml_tag::XmlTagParser;
