//! End-to-end pipeline tests over a JSON article manifest, plus batch runs
//! with per-document failure containment.

mod common;

use common::{MemSource, MemStore};
use metaharvest::{
    CollectingEmitter, ContentSource, JsonKind, JsonSchema, MetadataField, SourceExtractor,
    SourceSchema,
};

const MANIFEST_URL: &str = "store://jrnl/2024/issue-3/manifest.json";

const MANIFEST: &[u8] = br#"{
  "journal": {"title": "Annals of Examples", "issn": "1234-5678"},
  "articles": [
    {
      "doi": "10.5555/ex.1",
      "title": "On Widgets",
      "authors": ["Lovelace, Ada", "Babbage, Charles"],
      "firstPage": 1,
      "lastPage": 18,
      "file": "ex-1"
    },
    {
      "doi": "10.5555/ex.2",
      "title": "On Gadgets",
      "authors": [],
      "firstPage": 19,
      "lastPage": 40,
      "file": "ex-2"
    }
  ]
}"#;

fn manifest_schema() -> SourceSchema {
    JsonSchema::builder()
        .global_field("$.journal.title", JsonKind::String)
        .global_field("$.journal.issn", JsonKind::String)
        .record_boundary("$.articles[*]")
        .record_field("$.doi", JsonKind::String)
        .record_field("$.title", JsonKind::String)
        .record_field("$.authors", JsonKind::Array)
        .record_field("$.firstPage", JsonKind::Number)
        .record_field("$.lastPage", JsonKind::Number)
        .record_field("$.file", JsonKind::String)
        .cook("$.journal.title", MetadataField::PublicationTitle)
        .cook("$.journal.issn", MetadataField::Issn)
        .cook("$.doi", MetadataField::Doi)
        .cook("$.title", MetadataField::ArticleTitle)
        .cook("$.authors", MetadataField::Author)
        .cook("$.firstPage", MetadataField::StartPage)
        .cook("$.lastPage", MetadataField::EndPage)
        .filename_key("$.file")
        .filename_suffixes([".pdf"])
        .build()
        .unwrap()
        .into()
}

#[test]
fn test_manifest_pipeline() -> anyhow::Result<()> {
    common::init_tracing();
    let store = MemStore::new()
        .store("store://jrnl/2024/issue-3/ex-1.pdf", b"%PDF")
        .store("store://jrnl/2024/issue-3/ex-2.pdf", b"%PDF");
    let source = MemSource::new(MANIFEST_URL, MANIFEST);
    let mut emitter = CollectingEmitter::new();

    let extractor = SourceExtractor::new(manifest_schema());
    let emitted = extractor.extract(&source, &store, &mut emitter)?;
    assert_eq!(emitted, 2);

    let (url, first) = &emitter.records()[0];
    assert_eq!(url, MANIFEST_URL);
    assert_eq!(first.get(MetadataField::Doi), Some("10.5555/ex.1"));
    assert_eq!(first.get(MetadataField::ArticleTitle), Some("On Widgets"));
    assert_eq!(
        first.get(MetadataField::PublicationTitle),
        Some("Annals of Examples")
    );
    assert_eq!(first.get(MetadataField::Issn), Some("1234-5678"));
    assert_eq!(
        first.get_all(MetadataField::Author),
        &["Lovelace, Ada", "Babbage, Charles"]
    );
    assert_eq!(first.get(MetadataField::StartPage), Some("1"));
    assert_eq!(first.get(MetadataField::EndPage), Some("18"));
    assert_eq!(
        first.get(MetadataField::AccessUrl),
        Some("store://jrnl/2024/issue-3/ex-1.pdf")
    );

    let (_, second) = &emitter.records()[1];
    assert_eq!(second.get(MetadataField::Doi), Some("10.5555/ex.2"));
    assert!(!second.contains(MetadataField::Author));
    Ok(())
}

#[test]
fn test_batch_run_contains_per_document_failures() {
    common::init_tracing();
    let good = MemSource::new(MANIFEST_URL, MANIFEST);
    let malformed = MemSource::new("store://jrnl/2024/issue-4/manifest.json", b"{broken" as &[u8]);
    let empty = MemSource::new("store://jrnl/2024/issue-5/manifest.json", b"" as &[u8]);
    let store = MemStore::new()
        .store("store://jrnl/2024/issue-3/ex-1.pdf", b"%PDF")
        .store("store://jrnl/2024/issue-3/ex-2.pdf", b"%PDF");
    let mut emitter = CollectingEmitter::new();

    let sources: Vec<&dyn ContentSource> = vec![&malformed, &good, &empty];
    let extractor = SourceExtractor::new(manifest_schema());
    let outcome = extractor.extract_batch(sources, &store, &mut emitter);

    assert_eq!(outcome.documents, 3);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.emitted, 2);
    // the good document's records all arrived despite the failures around it
    assert_eq!(emitter.records().len(), 2);
}
