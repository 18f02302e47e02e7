//! Merge one chunk's per-page results into the growing output document.
//!
//! Per page, in order: decode each embedded image's base64 payload, persist
//! it under `images/page_<global>_<id>.png`, and rewrite the page text's
//! `![id](id)` placeholder to the persisted relative path. An image that
//! fails to decode or persist is logged and skipped — its placeholder stays
//! unresolved and the rest of the page merges normally.
//!
//! The page texts are joined with a blank line and appended (append-only
//! open) to the output file, followed by a trailing blank-line separator,
//! so successive chunks accumulate correctly and an interrupted run leaves
//! every previously merged chunk intact.

use crate::client::OcrPage;
use crate::error::Ocr2MdError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Counters describing what one merge call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub pages_merged: usize,
    pub images_written: usize,
    pub images_skipped: usize,
}

/// Image filename for a global page number and an image identifier.
///
/// The global page number keeps filenames unique across chunks: chunk 2 of
/// a 60-page-stride split starts numbering at 61, not 1.
pub fn image_file_name(global_page: usize, image_id: &str) -> String {
    format!("page_{global_page}_{image_id}.png")
}

/// Strip an optional `data:<mime>;base64,` prefix and decode the payload.
fn decode_image_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    BASE64_STANDARD.decode(encoded.trim())
}

/// Replace each persisted image's `![id](id)` placeholder with its
/// output-relative path. Unpersisted images keep their placeholder.
fn rewrite_image_refs(markdown: &str, persisted: &[(String, String)]) -> String {
    let mut text = markdown.to_string();
    for (id, rel_path) in persisted {
        text = text.replace(&format!("![{id}]({id})"), &format!("![{id}]({rel_path})"));
    }
    text
}

/// Merge `pages` into `output_file`, persisting images under `images_dir`.
///
/// `page_offset` is the number of source pages consumed by preceding
/// chunks; page `i` of this batch is global page `page_offset + i + 1`.
pub async fn merge_page_results(
    pages: &[OcrPage],
    page_offset: usize,
    output_file: &Path,
    images_dir: &Path,
) -> Result<MergeOutcome, Ocr2MdError> {
    let mut outcome = MergeOutcome::default();
    let mut rendered: Vec<String> = Vec::with_capacity(pages.len());

    for (i, page) in pages.iter().enumerate() {
        let global_page = page_offset + i + 1;
        let mut persisted: Vec<(String, String)> = Vec::new();

        for image in &page.images {
            let Some(payload) = image.image_base64.as_deref() else {
                warn!(page = global_page, id = %image.id, "image has no payload, skipping");
                outcome.images_skipped += 1;
                continue;
            };
            let data = match decode_image_payload(payload) {
                Ok(data) => data,
                Err(e) => {
                    warn!(page = global_page, id = %image.id, "image decode failed, skipping: {e}");
                    outcome.images_skipped += 1;
                    continue;
                }
            };

            let file_name = image_file_name(global_page, &image.id);
            let image_path = images_dir.join(&file_name);
            if let Err(e) = tokio::fs::write(&image_path, &data).await {
                warn!(
                    page = global_page,
                    id = %image.id,
                    path = %image_path.display(),
                    "image write failed, skipping: {e}"
                );
                outcome.images_skipped += 1;
                continue;
            }

            persisted.push((image.id.clone(), format!("images/{file_name}")));
            outcome.images_written += 1;
        }

        rendered.push(rewrite_image_refs(&page.markdown, &persisted));
        outcome.pages_merged += 1;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(output_file)
        .await
        .map_err(|source| Ocr2MdError::OutputWriteFailed {
            path: output_file.to_path_buf(),
            source,
        })?;
    let mut text = rendered.join("\n\n");
    text.push_str("\n\n");
    file.write_all(text.as_bytes())
        .await
        .map_err(|source| Ocr2MdError::OutputWriteFailed {
            path: output_file.to_path_buf(),
            source,
        })?;
    file.flush()
        .await
        .map_err(|source| Ocr2MdError::OutputWriteFailed {
            path: output_file.to_path_buf(),
            source,
        })?;

    debug!(
        pages = outcome.pages_merged,
        images = outcome.images_written,
        skipped = outcome.images_skipped,
        "chunk merged"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_names_use_global_page_numbers() {
        assert_eq!(image_file_name(1, "img-0"), "page_1_img-0.png");
        assert_eq!(image_file_name(61, "img-3"), "page_61_img-3.png");
    }

    #[test]
    fn decode_strips_data_uri_prefix() {
        let encoded = BASE64_STANDARD.encode(b"pixels");
        let uri = format!("data:image/png;base64,{encoded}");
        assert_eq!(decode_image_payload(&uri).unwrap(), b"pixels");
        // Bare payloads (no prefix) decode too.
        assert_eq!(decode_image_payload(&encoded).unwrap(), b"pixels");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image_payload("data:image/png;base64,!!!not-base64!!!").is_err());
    }

    #[test]
    fn rewrite_replaces_only_persisted_ids() {
        let md = "Intro ![img-0](img-0) and ![img-1](img-1).";
        let persisted = vec![("img-0".to_string(), "images/page_3_img-0.png".to_string())];
        let out = rewrite_image_refs(md, &persisted);
        assert!(out.contains("![img-0](images/page_3_img-0.png)"));
        assert!(out.contains("![img-1](img-1)"), "unpersisted placeholder kept");
    }

    #[test]
    fn rewrite_replaces_every_occurrence() {
        let md = "![a](a) text ![a](a)";
        let persisted = vec![("a".to_string(), "images/page_1_a.png".to_string())];
        let out = rewrite_image_refs(md, &persisted);
        assert_eq!(out.matches("images/page_1_a.png").count(), 2);
    }

    #[tokio::test]
    async fn unwritable_image_dir_skips_image_and_keeps_placeholder() {
        use crate::client::OcrImage;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.md");
        tokio::fs::write(&out, "").await.unwrap();
        // A plain file where the image directory should be: every image
        // write under it fails.
        let images = dir.path().join("images");
        tokio::fs::write(&images, b"not a directory").await.unwrap();

        let page = OcrPage {
            index: 0,
            markdown: "![fig](fig) caption".to_string(),
            images: vec![OcrImage {
                id: "fig".to_string(),
                image_base64: Some(BASE64_STANDARD.encode(b"pixels")),
            }],
        };

        let outcome = merge_page_results(&[page], 0, &out, &images).await.unwrap();
        assert_eq!(outcome.pages_merged, 1);
        assert_eq!(outcome.images_written, 0);
        assert_eq!(outcome.images_skipped, 1);

        // The page still merged, with its placeholder left unresolved.
        let content = tokio::fs::read_to_string(&out).await.unwrap();
        assert_eq!(content, "![fig](fig) caption\n\n");
    }

    #[tokio::test]
    async fn append_accumulates_chunks_in_order() {
        use crate::client::OcrPage;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.md");
        let images = dir.path().join("images");
        tokio::fs::create_dir_all(&images).await.unwrap();
        tokio::fs::write(&out, "").await.unwrap();

        let page = |text: &str| OcrPage {
            index: 0,
            markdown: text.to_string(),
            images: vec![],
        };

        merge_page_results(&[page("one"), page("two")], 0, &out, &images)
            .await
            .unwrap();
        merge_page_results(&[page("three")], 2, &out, &images)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&out).await.unwrap();
        assert_eq!(content, "one\n\ntwo\n\nthree\n\n");
    }
}
