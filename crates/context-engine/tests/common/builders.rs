//! Builders for creating test inputs programmatically.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

use context_engine::config::{Config, StoreBackend, VectorBackend};

/// Builds a small text PDF, one page per call to [`PdfBuilder::page`].
#[derive(Default)]
pub struct PdfBuilder {
    pages: Vec<Vec<String>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page showing each line at its own vertical offset.
    pub fn page(mut self, lines: &[&str]) -> Self {
        self.pages
            .push(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    /// Add a page with no content stream text at all.
    pub fn blank_page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in &self.pages {
            let mut content = String::new();
            for (i, line) in lines.iter().enumerate() {
                let y = 740 - (i as i64) * 16;
                content.push_str(&format!("BT /F1 12 Tf 50 {} Td ({}) Tj ET\n", y, line));
            }
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
        bytes
    }
}

/// A typical one-page CV.
pub fn sample_cv() -> Vec<u8> {
    PdfBuilder::new()
        .page(&[
            "Jordan Example",
            "Senior Software Engineer",
            "Ten years building distributed systems in Rust and Go",
            "Led the migration of a billing platform to event sourcing",
        ])
        .page(&["Education", "BSc Computer Science"])
        .build()
}

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// In-memory backends and small chunks so short documents still split.
    pub fn new() -> Self {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;
        config.vector_index.backend = VectorBackend::Memory;
        config.chunking.chunk_size = 60;
        config.chunking.chunk_overlap = 10;
        config.embedding.dimension = 32;
        Self { config }
    }

    pub fn sqlite_store(mut self, path: &str) -> Self {
        self.config.store.backend = StoreBackend::Sqlite;
        self.config.store.path = Some(path.to_string());
        self
    }

    pub fn chunking(mut self, size: usize, overlap: usize) -> Self {
        self.config.chunking.chunk_size = size;
        self.config.chunking.chunk_overlap = overlap;
        self
    }

    pub fn collection(mut self, name: &str) -> Self {
        self.config.vector_index.collection = name.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
