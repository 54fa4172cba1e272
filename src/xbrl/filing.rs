use anyhow::{anyhow, Context as _, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::document::FilingDocuments;
use super::parser;

/// The files of one XBRL filing that reconstruction needs.
#[derive(Clone, Debug, PartialEq)]
pub struct FilingFiles {
    pub schema: PathBuf,
    pub calculation: PathBuf,
    pub presentation: PathBuf,
    pub instance: PathBuf,
    pub label: Option<PathBuf>,
    pub definition: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum FileKind {
    Schema,
    Calculation,
    Presentation,
    Label,
    Definition,
    Instance,
}

fn classify(path: &Path) -> Option<FileKind> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    if name.ends_with(".xsd") {
        Some(FileKind::Schema)
    } else if name.ends_with("_cal.xml") {
        Some(FileKind::Calculation)
    } else if name.ends_with("_pre.xml") {
        Some(FileKind::Presentation)
    } else if name.ends_with("_lab.xml") {
        Some(FileKind::Label)
    } else if name.ends_with("_def.xml") {
        Some(FileKind::Definition)
    } else if name.ends_with(".xml") {
        Some(FileKind::Instance)
    } else {
        None
    }
}

impl FilingFiles {
    /// Assigns the files of `dir` to their role by suffix. Exactly one
    /// instance document is expected next to the linkbases.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut schema = None;
        let mut calculation = None;
        let mut presentation = None;
        let mut label = None;
        let mut definition = None;
        let mut instances = Vec::new();

        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read filing directory {:?}", dir))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match classify(&path) {
                Some(FileKind::Schema) => schema = Some(path),
                Some(FileKind::Calculation) => calculation = Some(path),
                Some(FileKind::Presentation) => presentation = Some(path),
                Some(FileKind::Label) => label = Some(path),
                Some(FileKind::Definition) => definition = Some(path),
                Some(FileKind::Instance) => instances.push(path),
                None => log::debug!("Ignoring {:?}", path),
            }
        }

        if instances.len() > 1 {
            return Err(anyhow!(
                "Expected a single instance document in {:?}, found {}",
                dir,
                instances.len()
            ));
        }

        let missing = |kind: &str| anyhow!("No {} found in {:?}", kind, dir);
        Ok(Self {
            schema: schema.ok_or_else(|| missing("taxonomy schema (.xsd)"))?,
            calculation: calculation.ok_or_else(|| missing("calculation linkbase (_cal.xml)"))?,
            presentation: presentation
                .ok_or_else(|| missing("presentation linkbase (_pre.xml)"))?,
            instance: instances
                .pop()
                .ok_or_else(|| missing("instance document (.xml)"))?,
            label,
            definition,
        })
    }

    pub fn load(&self) -> Result<FilingDocuments> {
        let read = |path: &Path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
        };

        let roles = parser::parse_schema_roles(&read(&self.schema)?)?;
        let calculation = parser::parse_calculation_linkbase(&read(&self.calculation)?)?;
        let presentation = parser::parse_presentation_linkbase(&read(&self.presentation)?)?;
        let instance = parser::parse_instance(&read(&self.instance)?)?;

        log::info!(
            "Loaded filing {:?}: {} roles, {} calculation roles, {} facts",
            self.instance,
            roles.len(),
            calculation.len(),
            instance.facts.len()
        );

        Ok(FilingDocuments {
            roles,
            calculation,
            presentation,
            facts: instance.facts,
            contexts: instance.contexts,
            period_end: instance.period_end,
        })
    }
}

pub fn load_filing(dir: &Path) -> Result<FilingDocuments> {
    FilingFiles::discover(dir)?.load()
}
