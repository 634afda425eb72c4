use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::models::ocr::{BoundingBox, RecognizedText, TextBlock};

/// Client for a Vision-style document text recognition REST API.
pub struct RecognitionClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    responses: Vec<AnnotateResult>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct ApiStatus {
    message: String,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    #[serde(default)]
    confidence: f64,
    bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    paragraphs: Vec<Paragraph>,
}

#[derive(Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

#[derive(Deserialize, Default, Clone, Copy)]
struct Vertex {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Deserialize)]
struct Paragraph {
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Deserialize)]
struct Word {
    #[serde(default)]
    symbols: Vec<Symbol>,
}

#[derive(Deserialize)]
struct Symbol {
    #[serde(default)]
    text: String,
}

impl RecognitionClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Run document text detection on image bytes. Blocks below the
    /// confidence threshold are dropped; the full text is kept as-is.
    pub async fn recognize(
        &self,
        image_bytes: &[u8],
        language: &str,
        confidence_threshold: f64,
    ) -> Result<RecognizedText, RecognitionError> {
        let url = format!("{}/v1/images:annotate?key={}", self.endpoint, self.api_key);

        let request_body = serde_json::json!({
            "requests": [{
                "image": {
                    "content": base64::engine::general_purpose::STANDARD.encode(image_bytes)
                },
                "features": [{"type": "DOCUMENT_TEXT_DETECTION"}],
                "imageContext": {"languageHints": [language]}
            }]
        });

        let response = self
            .http
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(RecognitionError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Api(format!(
                "annotate returned {}: {}",
                status, body
            )));
        }

        let parsed: AnnotateResponse = response.json().await.map_err(RecognitionError::Http)?;
        let result = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| RecognitionError::Api("empty annotate response".to_string()))?;

        if let Some(err) = result.error {
            return Err(RecognitionError::Api(err.message));
        }

        let annotation = match result.full_text_annotation {
            Some(a) => a,
            // No text in the image is a valid empty result, not a failure.
            None => {
                return Ok(RecognizedText {
                    full_text: String::new(),
                    blocks: Vec::new(),
                    pages: 0,
                })
            }
        };

        let pages = annotation.pages.len();
        let mut blocks = Vec::new();
        for page in &annotation.pages {
            for block in &page.blocks {
                if block.confidence < confidence_threshold {
                    continue;
                }
                blocks.push(TextBlock {
                    text: block_text(block),
                    bbox: bounding_box(block.bounding_box.as_ref()),
                    confidence: block.confidence,
                });
            }
        }

        Ok(RecognizedText {
            full_text: annotation.text,
            blocks,
            pages,
        })
    }
}

fn block_text(block: &Block) -> String {
    let mut words = Vec::new();
    for paragraph in &block.paragraphs {
        for word in &paragraph.words {
            let w: String = word.symbols.iter().map(|s| s.text.as_str()).collect();
            if !w.is_empty() {
                words.push(w);
            }
        }
    }
    words.join(" ")
}

fn bounding_box(poly: Option<&BoundingPoly>) -> BoundingBox {
    let vertices = match poly {
        Some(p) if !p.vertices.is_empty() => &p.vertices,
        _ => {
            return BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            }
        }
    };
    let min_x = vertices.iter().map(|v| v.x).min().unwrap_or(0);
    let min_y = vertices.iter().map(|v| v.y).min().unwrap_or(0);
    let max_x = vertices.iter().map(|v| v.x).max().unwrap_or(0);
    let max_y = vertices.iter().map(|v| v.y).max().unwrap_or(0);
    BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Recognition API error: {0}")]
    Api(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_from_vertices() {
        let poly = BoundingPoly {
            vertices: vec![
                Vertex { x: 10, y: 20 },
                Vertex { x: 110, y: 20 },
                Vertex { x: 110, y: 60 },
                Vertex { x: 10, y: 60 },
            ],
        };
        let bbox = bounding_box(Some(&poly));
        assert_eq!(
            bbox,
            BoundingBox {
                x: 10,
                y: 20,
                width: 100,
                height: 40
            }
        );
    }

    #[test]
    fn missing_poly_yields_zero_box() {
        let bbox = bounding_box(None);
        assert_eq!(bbox.width, 0);
        assert_eq!(bbox.height, 0);
    }

    #[test]
    fn block_text_joins_words() {
        let block = Block {
            confidence: 0.9,
            bounding_box: None,
            paragraphs: vec![Paragraph {
                words: vec![
                    Word {
                        symbols: vec![
                            Symbol { text: "H".to_string() },
                            Symbol { text: "i".to_string() },
                        ],
                    },
                    Word {
                        symbols: vec![Symbol { text: "!".to_string() }],
                    },
                ],
            }],
        };
        assert_eq!(block_text(&block), "Hi !");
    }
}
