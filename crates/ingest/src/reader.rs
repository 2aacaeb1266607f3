use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

use crate::chunk::Document;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

pub struct FileReader;

impl FileReader {
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub async fn read_file(path: &Path) -> Result<Document> {
        let body = fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        Ok(Document {
            doc_id: path.to_string_lossy().to_string(),
            title: title_case(&stem.replace('_', " ")),
            body,
        })
    }

    /// Load a single file, or every supported file under a directory in sorted path order
    pub async fn load_documents(path: &Path) -> Result<Vec<Document>> {
        if path.is_file() {
            return Ok(vec![Self::read_file(path).await?]);
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.context(format!("Failed to walk directory: {:?}", path))?;
            if entry.file_type().is_file() && Self::is_supported(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for file in paths {
            documents.push(Self::read_file(&file).await?);
        }

        tracing::info!(path = %path.display(), documents = documents.len(), "Loaded documents");
        Ok(documents)
    }
}

/// Uppercase the first letter of every word, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("graph rag notes"), "Graph Rag Notes");
        assert_eq!(title_case("PARIS trip"), "Paris Trip");
    }

    #[tokio::test]
    async fn test_load_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b_notes.md"), "Bob travels to Paris often.").unwrap();
        std::fs::write(dir.path().join("a_notes.txt"), "Alice met Bob in Paris.").unwrap();
        std::fs::write(dir.path().join("image.png"), "not text").unwrap();
        std::fs::write(dir.path().join("nested").join("c.MD"), "Nested file.").unwrap();

        let docs = FileReader::load_documents(dir.path()).await.unwrap();

        assert_eq!(docs.len(), 3);
        assert!(docs[0].doc_id.ends_with("a_notes.txt"));
        assert_eq!(docs[0].title, "A Notes");
        assert!(docs[1].doc_id.ends_with("b_notes.md"));
        assert!(docs[2].doc_id.ends_with("c.MD"));
    }

    #[tokio::test]
    async fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("solo.txt");
        std::fs::write(&file, "Single document body.").unwrap();

        let docs = FileReader::load_documents(&file).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body, "Single document body.");
    }
}
