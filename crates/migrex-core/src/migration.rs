use crate::model::{IdField, MigrationDefinition};
use crate::process::ProcessPipeline;
use crate::source::{self, SourceReader};

/// A migration ready to run: its source reader and compiled pipeline
///
/// Capabilities are chosen once, at construction time.
pub struct Migration {
    id: String,
    tags: Vec<String>,
    source: Box<dyn SourceReader>,
    pipeline: ProcessPipeline,
}

impl Migration {
    pub fn new(id: impl Into<String>, source: Box<dyn SourceReader>, pipeline: ProcessPipeline) -> Self {
        Self {
            id: id.into(),
            tags: Vec::new(),
            source,
            pipeline,
        }
    }

    pub fn from_definition(definition: &MigrationDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            tags: definition.migration_tags.clone(),
            source: source::from_config(&definition.source),
            pipeline: ProcessPipeline::new(&definition.process),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn source(&self) -> &dyn SourceReader {
        self.source.as_ref()
    }

    pub fn pipeline(&self) -> &ProcessPipeline {
        &self.pipeline
    }

    pub fn id_fields(&self) -> &[IdField] {
        self.source.id_fields()
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("tags", &self.tags)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
