// src/extractors/document.rs
use crate::config::Strictness;
use crate::extractors::accessor::{is_named, select_first, Step};
use crate::extractors::sections::SectionExtractor;
use crate::ted::diagnostics::Diagnostic;
use crate::ted::models::{RawCodedData, RawRecord};
use crate::utils::error::ExtractError;
use roxmltree::{Document, Node};

const NOTICE_DATA_PATH: &[Step] = &[Step::Child("CODED_DATA_SECTION"), Step::Child("NOTICE_DATA")];
const CODIF_DATA_PATH: &[Step] = &[Step::Child("CODED_DATA_SECTION"), Step::Child("CODIF_DATA")];

/// Raw record of one document together with the advisory notes raised while reading it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: RawRecord,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the raw (ragged) record of a TED export document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoticeExtractor {
    strictness: Strictness,
}

impl NoticeExtractor {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    /// Parses `xml` and extracts it.
    pub fn extract_str(&self, xml: &str) -> Result<Extraction, ExtractError> {
        let document = Document::parse(xml)?;
        self.extract(&document)
    }

    /// Reads the document identifier, the coded-data sections and the contract body.
    pub fn extract(&self, document: &Document) -> Result<Extraction, ExtractError> {
        let root = document.root_element();
        if !is_named(&root, "TED_EXPORT") {
            tracing::debug!("Unexpected root element <{}>", root.tag_name().name());
        }

        let mut sections = SectionExtractor::new(self.strictness);

        let notice_node = required(root, NOTICE_DATA_PATH, "CODED_DATA_SECTION/NOTICE_DATA")?;
        let codif_node = required(root, CODIF_DATA_PATH, "CODED_DATA_SECTION/CODIF_DATA")?;
        let form = required(root, &[Step::Child("FORM_SECTION")], "FORM_SECTION")?;

        let coded_data = RawCodedData {
            notice_data: sections.notice_data(notice_node)?,
            codif_data: sections.codif_data(codif_node),
        };
        let contract = sections.contract(form)?;

        let record = RawRecord {
            doc_id: root.attribute("DOC_ID").map(str::to_string).into_iter().collect(),
            coded_data,
            contract,
        };
        Ok(Extraction { record, diagnostics: sections.into_diagnostics() })
    }
}

fn required<'a, 'input>(
    root: Node<'a, 'input>,
    path: &'static [Step],
    label: &str,
) -> Result<Node<'a, 'input>, ExtractError> {
    select_first(root, path).ok_or_else(|| ExtractError::SectionNotFound(label.to_string()))
}
