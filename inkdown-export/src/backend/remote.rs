//! Remote documents backend
//!
//! Publishes plans through two REST services: a documents API that creates
//! the document and executes batched operations, and a file-storage API that
//! hosts diagram images the document embeds by URL.
//!
//! The batch discipline mirrors the plan contract: one `:batchUpdate` call
//! carrying every insertion in document order, then a second call carrying
//! every styling operation. Styling in the same batch as insertions would
//! see offsets that are still shifting.
//!
//!   POST {docs}/v1/documents                {"title"} -> {"documentId"}
//!   POST {docs}/v1/documents/{id}:batchUpdate        {"requests": [...]}
//!   POST {files}/v1/files?name={n}          PNG body  -> {"id"}
//!   POST {files}/v1/files/{id}/permissions  {"type","role"}
//!   GET  {files}/v1/files/{id}/content      (public once permitted)

use crate::backend::auth::{AuthPrompt, NoPrompt, TokenStore};
use crate::backend::{heading_font_size, Backend, BackendArtifact};
use crate::builder::{DocumentPlan, InsertOp};
use crate::error::ExportError;
use crate::http;
use crate::inline::Style;
use crate::render::RenderedDiagram;
use crate::table::{TableCell, TableModel};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/// Embedded image size sent with every image insertion, in points.
const IMAGE_WIDTH_PT: u32 = 400;
const IMAGE_HEIGHT_PT: u32 = 300;

/// Hosts and credential locations for one remote deployment.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub docs_host: String,
    pub files_host: String,
    pub credentials_path: PathBuf,
    /// Override for the token cache; defaults to `token.json` next to the
    /// credentials file.
    pub token_path: Option<PathBuf>,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            docs_host: "https://docs.api.inkdown.dev".to_string(),
            files_host: "https://files.api.inkdown.dev".to_string(),
            credentials_path: PathBuf::from("credentials.json"),
            token_path: None,
        }
    }
}

/// Backend creating documents on the remote service.
pub struct RemoteBackend {
    options: RemoteOptions,
    store: TokenStore,
    prompt: Box<dyn AuthPrompt>,
    agent: ureq::Agent,
}

impl RemoteBackend {
    pub fn new(options: RemoteOptions, prompt: Box<dyn AuthPrompt>) -> Self {
        let mut store = TokenStore::new(&options.credentials_path);
        if let Some(token_path) = &options.token_path {
            store = store.with_token_path(token_path);
        }
        Self {
            options,
            store,
            prompt,
            agent: http::agent(),
        }
    }

    fn docs_host(&self) -> &str {
        self.options.docs_host.trim_end_matches('/')
    }

    fn files_host(&self) -> &str {
        self.options.files_host.trim_end_matches('/')
    }
}

impl Default for RemoteBackend {
    fn default() -> Self {
        Self::new(RemoteOptions::default(), Box::new(NoPrompt))
    }
}

impl Backend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    fn description(&self) -> &str {
        "Cloud document created through the remote documents API"
    }

    // Index 0 holds immutable document metadata on the service.
    fn cursor_origin(&self) -> usize {
        1
    }

    fn publish(
        &self,
        plan: &DocumentPlan,
        diagrams: &[RenderedDiagram],
    ) -> Result<BackendArtifact, ExportError> {
        let token = self.store.access_token(&self.agent, self.prompt.as_ref())?;
        let document_id = self.create_document(&token, &plan.title)?;
        let image_urls = self.upload_images(&token, plan, diagrams)?;

        let inserts = insertion_requests(plan, &image_urls);
        if !inserts.is_empty() {
            self.batch_update(&token, &document_id, inserts)?;
        }
        let styles = styling_requests(plan);
        if !styles.is_empty() {
            self.batch_update(&token, &document_id, styles)?;
        }

        let url = format!("{}/documents/{document_id}", self.docs_host());
        Ok(BackendArtifact::Remote { document_id, url })
    }
}

impl RemoteBackend {
    fn create_document(&self, token: &str, title: &str) -> Result<String, ExportError> {
        let url = format!("{}/v1/documents", self.docs_host());
        let response = self.post_json(token, &url, &json!({ "title": title }))?;
        response["documentId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ExportError::RemoteApi("document creation response lacks documentId".to_string())
            })
    }

    /// Upload every diagram the plan embeds and open it to link access, so
    /// the documents service can fetch it by URL while importing.
    fn upload_images(
        &self,
        token: &str,
        plan: &DocumentPlan,
        diagrams: &[RenderedDiagram],
    ) -> Result<HashMap<usize, String>, ExportError> {
        let mut urls = HashMap::new();
        for op in &plan.inserts {
            let InsertOp::Image { diagram, .. } = op else {
                continue;
            };
            let bytes = diagrams
                .get(*diagram)
                .and_then(|image| image.as_ref())
                .ok_or_else(|| {
                    ExportError::Render(format!("plan references unrendered diagram {diagram}"))
                })?;

            let upload_url = format!(
                "{}/v1/files?name=diagram-{diagram}.png",
                self.files_host()
            );
            let response = self.post_bytes(token, &upload_url, "image/png", bytes)?;
            let file_id = response["id"].as_str().ok_or_else(|| {
                ExportError::RemoteApi("file upload response lacks id".to_string())
            })?;

            let permission_url = format!("{}/v1/files/{file_id}/permissions", self.files_host());
            self.post_json(
                token,
                &permission_url,
                &json!({ "type": "anyone", "role": "reader" }),
            )?;

            urls.insert(
                *diagram,
                format!("{}/v1/files/{file_id}/content", self.files_host()),
            );
        }
        Ok(urls)
    }

    fn batch_update(
        &self,
        token: &str,
        document_id: &str,
        requests: Vec<Value>,
    ) -> Result<(), ExportError> {
        let url = format!(
            "{}/v1/documents/{document_id}:batchUpdate",
            self.docs_host()
        );
        self.post_json(token, &url, &json!({ "requests": requests }))?;
        Ok(())
    }

    fn post_json(&self, token: &str, url: &str, body: &Value) -> Result<Value, ExportError> {
        let payload = body.to_string();
        let response = self
            .agent
            .post(url)
            .header("Authorization", &format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .send(payload.as_str())
            .map_err(|e| ExportError::RemoteApi(format!("POST {url} failed: {e}")))?;
        read_json(response, url)
    }

    fn post_bytes(
        &self,
        token: &str,
        url: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Value, ExportError> {
        let response = self
            .agent
            .post(url)
            .header("Authorization", &format!("Bearer {token}"))
            .header("Content-Type", content_type)
            .send(body)
            .map_err(|e| ExportError::RemoteApi(format!("POST {url} failed: {e}")))?;
        read_json(response, url)
    }
}

fn read_json(
    response: ureq::http::Response<ureq::Body>,
    url: &str,
) -> Result<Value, ExportError> {
    let text = response
        .into_body()
        .with_config()
        .limit(http::MAX_API_RESPONSE_SIZE)
        .read_to_string()
        .map_err(|e| ExportError::RemoteApi(format!("reading response from {url}: {e}")))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| ExportError::RemoteApi(format!("malformed response from {url}: {e}")))
}

/// Insertion batch, one request per plan op, in document order.
fn insertion_requests(plan: &DocumentPlan, image_urls: &HashMap<usize, String>) -> Vec<Value> {
    plan.inserts
        .iter()
        .map(|op| match op {
            InsertOp::Text { at, text, .. } => json!({
                "insertText": {
                    "location": { "index": at },
                    "text": text,
                }
            }),
            InsertOp::Image { at, diagram } => json!({
                "insertInlineImage": {
                    "location": { "index": at },
                    "uri": image_urls.get(diagram),
                    "objectSize": {
                        "height": { "magnitude": IMAGE_HEIGHT_PT, "unit": "PT" },
                        "width": { "magnitude": IMAGE_WIDTH_PT, "unit": "PT" },
                    }
                }
            }),
            InsertOp::Table { at, table } => table_request(*at, table),
        })
        .collect()
}

/// Cell content rides inside the table insertion, so the table costs one
/// cursor unit and never perturbs later offsets.
fn table_request(at: usize, table: &TableModel) -> Value {
    let mut rows = Vec::with_capacity(table.row_count());
    rows.push(cell_row(&table.header, table.column_count()));
    for row in &table.rows {
        rows.push(cell_row(row, table.column_count()));
    }
    json!({
        "insertTable": {
            "location": { "index": at },
            "rows": table.row_count(),
            "columns": table.column_count(),
            "cells": rows,
        }
    })
}

fn cell_row(cells: &[TableCell], width: usize) -> Value {
    let padded: Vec<Value> = (0..width)
        .map(|index| match cells.get(index) {
            Some(cell) => json!({ "text": cell.text, "monospace": cell.monospace }),
            None => json!({ "text": "", "monospace": false }),
        })
        .collect();
    Value::Array(padded)
}

/// Styling batch; only valid after the insertion batch has executed.
fn styling_requests(plan: &DocumentPlan) -> Vec<Value> {
    let mut requests = Vec::new();
    for op in &plan.styles {
        let range = json!({ "startIndex": op.start, "endIndex": op.end });
        match &op.style {
            Style::Bold => requests.push(json!({
                "updateTextStyle": {
                    "range": range,
                    "textStyle": { "bold": true },
                    "fields": "bold",
                }
            })),
            Style::Italic => requests.push(json!({
                "updateTextStyle": {
                    "range": range,
                    "textStyle": { "italic": true },
                    "fields": "italic",
                }
            })),
            Style::Link(url) => requests.push(json!({
                "updateTextStyle": {
                    "range": range,
                    "textStyle": {
                        "link": { "url": url },
                        "underline": true,
                        "foregroundColor": {
                            "color": { "rgbColor": { "red": 0.0, "green": 0.0, "blue": 1.0 } }
                        },
                    },
                    "fields": "link,underline,foregroundColor",
                }
            })),
            Style::Heading(level) => requests.push(json!({
                "updateTextStyle": {
                    "range": range,
                    "textStyle": {
                        "fontSize": { "magnitude": heading_font_size(*level), "unit": "PT" },
                        "bold": true,
                    },
                    "fields": "fontSize,bold",
                }
            })),
            Style::CodeBlock => {
                requests.push(json!({
                    "updateTextStyle": {
                        "range": range,
                        "textStyle": {
                            "weightedFontFamily": { "fontFamily": "Courier New" },
                            "fontSize": { "magnitude": 10, "unit": "PT" },
                            "backgroundColor": {
                                "color": { "rgbColor": { "red": 0.95, "green": 0.95, "blue": 0.95 } }
                            },
                        },
                        "fields": "weightedFontFamily,fontSize,backgroundColor",
                    }
                }));
                requests.push(json!({
                    "updateParagraphStyle": {
                        "range": range,
                        "paragraphStyle": {
                            "borderTop": code_border(),
                            "borderBottom": code_border(),
                            "borderLeft": code_border(),
                            "borderRight": code_border(),
                            "shading": {
                                "backgroundColor": {
                                    "color": { "rgbColor": { "red": 0.95, "green": 0.95, "blue": 0.95 } }
                                }
                            },
                        },
                        "fields": "borderTop,borderBottom,borderLeft,borderRight,shading",
                    }
                }));
            }
        }
    }
    requests
}

fn code_border() -> Value {
    json!({
        "color": { "color": { "rgbColor": { "red": 0.0, "green": 0.0, "blue": 0.0 } } },
        "width": { "magnitude": 1.0, "unit": "PT" },
        "padding": { "magnitude": 10.0, "unit": "PT" },
        "dashStyle": "SOLID",
    })
}
