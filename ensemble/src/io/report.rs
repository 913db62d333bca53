//! Writes the generated document suite to a timestamped output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::core::state::Document;

/// Where one run's documents landed.
#[derive(Debug, Clone)]
pub struct SavedDocuments {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub index_path: PathBuf,
}

/// Write every document plus an `index.md` into
/// `analysis_output_<timestamp>/` under `root`.
pub fn save_documents(
    root: &Path,
    documents: &[Document],
    query: &str,
    generated_at: DateTime<Local>,
) -> Result<SavedDocuments> {
    let stamp = generated_at.format("%Y%m%d_%H%M%S");
    let dir = root.join(format!("analysis_output_{stamp}"));
    fs::create_dir_all(&dir).with_context(|| format!("create output dir {}", dir.display()))?;

    let mut files = Vec::with_capacity(documents.len());
    for document in documents {
        let file_name = format!("{}_{stamp}.{}", document.doc_type, document.format.extension());
        let path = dir.join(file_name);
        fs::write(&path, &document.content)
            .with_context(|| format!("write document {}", path.display()))?;
        debug!(path = %path.display(), doc_type = %document.doc_type, "document written");
        files.push(path);
    }

    let index_path = dir.join("index.md");
    fs::write(&index_path, render_index(documents, query, generated_at))
        .with_context(|| format!("write index {}", index_path.display()))?;

    info!(dir = %dir.display(), count = documents.len(), "documents saved");
    Ok(SavedDocuments {
        dir,
        files,
        index_path,
    })
}

fn render_index(documents: &[Document], query: &str, generated_at: DateTime<Local>) -> String {
    let mut index = format!(
        "# Analysis Output Index\n\n**Query:** {query}\n**Generated:** {}\n\n## Documents\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    for document in documents {
        index.push_str(&format!("- **{}** ({})\n", document.title, document.doc_type));
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::DocumentFormat;
    use chrono::TimeZone;

    fn document(doc_type: &str, format: DocumentFormat) -> Document {
        Document {
            doc_type: doc_type.to_string(),
            title: format!("{doc_type} title"),
            content: format!("{doc_type} body"),
            format,
        }
    }

    #[test]
    fn saves_documents_with_format_extensions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generated_at = Local.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
        let documents = vec![
            document("main_report", DocumentFormat::Markdown),
            document("technical_export", DocumentFormat::Json),
        ];

        let saved =
            save_documents(temp.path(), &documents, "a query", generated_at).expect("save");

        assert_eq!(saved.files.len(), 2);
        assert!(saved.dir.ends_with("analysis_output_20240309_080000"));
        assert!(saved.files[0].to_string_lossy().ends_with("main_report_20240309_080000.md"));
        assert!(
            saved.files[1].to_string_lossy().ends_with("technical_export_20240309_080000.json")
        );
        let body = fs::read_to_string(&saved.files[0]).expect("read");
        assert_eq!(body, "main_report body");
    }

    #[test]
    fn index_lists_every_document() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generated_at = Local.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
        let documents = vec![
            document("executive_summary", DocumentFormat::Markdown),
            document("methodology_document", DocumentFormat::Markdown),
        ];

        let saved = save_documents(temp.path(), &documents, "the query", generated_at)
            .expect("save");
        let index = fs::read_to_string(&saved.index_path).expect("read index");

        assert!(index.contains("**Query:** the query"));
        assert!(index.contains("executive_summary"));
        assert!(index.contains("methodology_document title"));
    }
}
