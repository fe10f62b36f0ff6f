use std::{
    collections::HashMap,
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use log::{error, info};
use parking_lot::Mutex;
use serde::Deserialize;

use super::{find_in_pages, join_pages, ExtractedText, ExtractionError, TextSource};

/// How to run the extractor script: `<python> <script> <document>`.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub python: OsString,
    pub script: PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            python: OsString::from("python"),
            script: PathBuf::from("scripts/py/pdf_extract.py"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractorOutput {
    ok: bool,
    #[serde(default)]
    pages: Vec<PageOutput>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageOutput {
    #[serde(default)]
    text: String,
}

/// PDF pages extracted once per document and kept in memory afterwards.
pub struct PdfTextSource {
    config: ExtractorConfig,
    pages: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl PdfTextSource {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            pages: Mutex::new(HashMap::new()),
        }
    }

    fn pages(&self, document: &str) -> Result<Arc<Vec<String>>, ExtractionError> {
        if let Some(pages) = self.pages.lock().get(document) {
            return Ok(Arc::clone(pages));
        }
        let pages = Arc::new(self.run_extractor(Path::new(document))?);
        self.pages
            .lock()
            .insert(document.to_string(), Arc::clone(&pages));
        Ok(pages)
    }

    fn run_extractor(&self, pdf_path: &Path) -> Result<Vec<String>, ExtractionError> {
        if !pdf_path.exists() {
            return Err(ExtractionError::NotFound(pdf_path.to_path_buf()));
        }

        let output = Command::new(&self.config.python)
            .arg(&self.config.script)
            .arg(pdf_path)
            .output()
            .map_err(|err| {
                error!("Could not run pdf extractor: {err}");
                ExtractionError::Spawn(err)
            })?;

        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("pdf extractor failed: {message}");
            return Err(ExtractionError::ScriptFailed(message));
        }

        let parsed: ExtractorOutput =
            serde_json::from_slice(&output.stdout).map_err(ExtractionError::Parse)?;
        if !parsed.ok {
            return Err(ExtractionError::Rejected {
                code: parsed.code.unwrap_or_else(|| "PDF_PARSE_FAIL".into()),
                message: parsed
                    .message
                    .unwrap_or_else(|| "failed to import PDF".into()),
            });
        }

        info!(
            "Extracted {} pages from {}",
            parsed.pages.len(),
            pdf_path.display()
        );
        Ok(parsed.pages.into_iter().map(|page| page.text).collect())
    }
}

impl TextSource for PdfTextSource {
    fn extract(
        &self,
        document: &str,
        start: usize,
        end: Option<usize>,
    ) -> Result<ExtractedText, ExtractionError> {
        let pages = self.pages(document)?;
        let total_pages = pages.len();
        let end = end.unwrap_or(total_pages).min(total_pages);
        let selected = pages
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(String::as_str);
        Ok(ExtractedText {
            text: join_pages(start, selected),
            total_pages,
        })
    }

    fn page_count(&self, document: &str) -> Result<usize, ExtractionError> {
        Ok(self.pages(document)?.len())
    }

    fn find_keyword(
        &self,
        document: &str,
        keywords: &[&str],
        page_limit: Option<usize>,
    ) -> Result<Option<usize>, ExtractionError> {
        let pages = self.pages(document)?;
        Ok(find_in_pages(
            pages.iter().map(String::as_str),
            keywords,
            page_limit,
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn source_with_stub(temp: &TempDir, body: &str) -> PdfTextSource {
        let script = temp.child("extract_stub.sh");
        script.write_str(body).unwrap();
        PdfTextSource::new(ExtractorConfig {
            python: OsString::from("sh"),
            script: script.path().to_path_buf(),
        })
    }

    fn document(temp: &TempDir) -> String {
        let pdf = temp.child("book.pdf");
        pdf.touch().unwrap();
        pdf.path().to_string_lossy().into_owned()
    }

    const THREE_PAGES: &str = r#"echo '{"ok": true, "pages": [{"text": "Cover"}, {"text": "Preface here."}, {"text": "Chapter 1. It begins."}], "meta": {"title": "Demo"}}'
"#;

    #[test]
    fn extracts_a_page_range() {
        let temp = TempDir::new().unwrap();
        let source = source_with_stub(&temp, THREE_PAGES);
        let doc = document(&temp);

        let range = source.extract(&doc, 1, Some(2)).unwrap();
        assert_eq!(range.total_pages, 3);
        assert_eq!(range.text, "\nPage 2.\nPreface here.");

        let tail = source.extract(&doc, 2, None).unwrap();
        assert_eq!(tail.text, "\nPage 3.\nChapter 1. It begins.");

        let past_end = source.extract(&doc, 7, None).unwrap();
        assert!(past_end.text.is_empty());
        assert_eq!(source.page_count(&doc).unwrap(), 3);
    }

    #[test]
    fn finds_keywords_in_cached_pages() {
        let temp = TempDir::new().unwrap();
        let source = source_with_stub(&temp, THREE_PAGES);
        let doc = document(&temp);
        assert_eq!(
            source.find_keyword(&doc, &["chapter 1"], None).unwrap(),
            Some(2)
        );
        temp.child("extract_stub.sh").write_str("exit 1\n").unwrap();
        assert_eq!(source.find_keyword(&doc, &["preface"], None).unwrap(), Some(1));
    }

    #[test]
    fn missing_document_is_reported() {
        let temp = TempDir::new().unwrap();
        let source = source_with_stub(&temp, THREE_PAGES);
        let missing = temp.path().join("nope.pdf");
        let error = source
            .extract(&missing.to_string_lossy(), 0, None)
            .unwrap_err();
        assert!(matches!(error, ExtractionError::NotFound(_)));
    }

    #[test]
    fn surfaces_script_failure() {
        let temp = TempDir::new().unwrap();
        let source = source_with_stub(&temp, "echo broken >&2\nexit 1\n");
        let error = source.extract(&document(&temp), 0, None).unwrap_err();
        match error {
            ExtractionError::ScriptFailed(message) => assert_eq!(message, "broken"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn surfaces_rejection_and_garbage() {
        let temp = TempDir::new().unwrap();
        let source = source_with_stub(
            &temp,
            r#"echo '{"ok": false, "code": "PDF_ENCRYPTED", "message": "locked"}'
"#,
        );
        let error = source.extract(&document(&temp), 0, None).unwrap_err();
        assert!(matches!(error, ExtractionError::Rejected { ref code, .. } if code == "PDF_ENCRYPTED"));

        let temp = TempDir::new().unwrap();
        let source = source_with_stub(&temp, "echo not json\n");
        let error = source.extract(&document(&temp), 0, None).unwrap_err();
        assert!(matches!(error, ExtractionError::Parse(_)));
    }
}
