//! MCP Server implementation using rmcp

use crate::bridge::load_document;
use crate::error::Error;
use crate::form::{ControlState, FieldRecord, FormControl};
use crate::pdf::QpdfWrapper;
use crate::session::SessionStore;
use crate::source::{resolve_base64, resolve_cache, resolve_path, CacheManager, ResolvedPdf};
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, service::RequestContext, tool, tool_handler, tool_router, RoleServer,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// PDF source specification
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Base64 encoded PDF data
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
    /// A previously saved form
    CacheRef {
        /// `output_cache_key` from save_form or fill_form
        cache_key: String,
    },
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        const EXPECTED: &str =
            "Invalid source: expected an object with one of \"path\", \"base64\", or \"cache_key\"";

        let value = serde_json::Value::deserialize(deserializer)?;

        let Some(obj) = value.as_object() else {
            let kind = match &value {
                serde_json::Value::Array(_) => "an array",
                serde_json::Value::String(_) => "a string",
                serde_json::Value::Number(_) => "a number",
                serde_json::Value::Bool(_) => "a boolean",
                serde_json::Value::Null => "null",
                serde_json::Value::Object(_) => "an object",
            };
            return Err(serde::de::Error::custom(format!(
                "{}, but got {}",
                EXPECTED, kind
            )));
        };

        let string_field = |key: &str| -> Option<std::result::Result<String, D::Error>> {
            obj.get(key).map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    serde::de::Error::custom(format!("\"{}\" must be a string", key))
                })
            })
        };

        if let Some(path) = string_field("path") {
            return Ok(PdfSource::Path { path: path? });
        }
        if let Some(base64) = string_field("base64") {
            return Ok(PdfSource::Base64 { base64: base64? });
        }
        if let Some(cache_key) = string_field("cache_key") {
            return Ok(PdfSource::CacheRef {
                cache_key: cache_key?,
            });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "{}, but got keys: {:?}",
            EXPECTED, keys
        )))
    }
}

/// Resource configuration for the form server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories to expose as PDF resources; when non-empty, every path
    /// the server reads or writes must lie inside one of them
    pub resource_dirs: Vec<String>,
    /// Maximum total bytes of cached outputs (default: 256MB)
    pub cache_max_bytes: usize,
    /// Maximum number of cached outputs (default: 100)
    pub cache_max_entries: usize,
    /// Maximum number of live form sessions (default: 32)
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            cache_max_bytes: 256 * 1024 * 1024, // 256MB
            cache_max_entries: 100,
            max_sessions: 32,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PDF_FORM_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dirs) = lookup("PDF_FORM_RESOURCE_DIRS") {
            config.resource_dirs = std::env::split_paths(&dirs)
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .collect();
        }
        parse_setting(&lookup, "PDF_FORM_MAX_SESSIONS", &mut config.max_sessions);
        parse_setting(&lookup, "PDF_FORM_CACHE_MAX_BYTES", &mut config.cache_max_bytes);
        parse_setting(&lookup, "PDF_FORM_CACHE_MAX_ENTRIES", &mut config.cache_max_entries);

        config
    }
}

fn parse_setting<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable setting"),
    }
}

/// PDF form MCP server
#[derive(Clone)]
pub struct PdfFormServer {
    cache: Arc<CacheManager>,
    sessions: Arc<SessionStore>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for load_form / get_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadFormParams {
    /// PDF to load
    pub source: PdfSource,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
    /// Reuse an existing session; a new one is opened when omitted
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Ready,
    NoFormFields,
    Error,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct LoadFormResult {
    pub session_id: String,
    /// Pass back to save_form
    pub generation: u64,
    pub source: String,
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Classified fields in document order
    pub fields: Vec<FieldRecord>,
    /// Editable controls, one group per field
    pub controls: Vec<FormControl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionParams {
    /// Session id returned by load_form
    pub session_id: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct GetFormResult {
    pub session_id: String,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub fields: Vec<FieldRecord>,
    pub controls: Vec<FormControl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for save_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveFormParams {
    /// Session id returned by load_form
    pub session_id: String,
    /// Generation returned by the load the controls were built from
    pub generation: u64,
    /// Edited control states; fields without a control are left untouched
    pub controls: Vec<ControlState>,
    /// Output file path, or an existing directory to write
    /// `filled-form-<millis>.pdf` into
    #[serde(default)]
    pub output_path: Option<String>,
    /// Return the saved PDF as base64
    #[serde(default)]
    pub include_base64: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FailedFieldInfo {
    /// Field name
    pub name: String,
    /// Why the field could not be updated
    pub reason: String,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct SaveFormResult {
    pub session_id: String,
    pub file_name: String,
    /// Cache key of the saved PDF; usable as a `{"cache_key"}` source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cache_key: Option<String>,
    /// Output size in bytes
    pub size: usize,
    /// Number of pages in output PDF
    pub output_page_count: u32,
    /// Names of the fields that were written
    pub fields_written: Vec<String>,
    pub fields_failed: Vec<FailedFieldInfo>,
    /// Path where PDF was saved (if output_path was specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for fill_form
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FormFieldValueParam {
    /// Field name to match
    pub name: String,
    /// Text, or the option to select for radio groups and choice fields
    #[serde(default)]
    pub value: Option<String>,
    /// Checked state (for checkboxes)
    #[serde(default)]
    pub checked: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FillFormParams {
    /// Source PDF containing form fields
    pub source: PdfSource,
    /// Field values to set
    pub field_values: Vec<FormFieldValueParam>,
    /// Output file path (optional). If provided, saves the filled PDF to this path.
    #[serde(default)]
    pub output_path: Option<String>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SkippedFieldInfo {
    /// Field name
    pub name: String,
    /// Reason the field was skipped
    pub reason: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FillFormResult {
    /// Source identifier
    pub source: String,
    pub file_name: String,
    /// Cache key for the output PDF
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cache_key: Option<String>,
    /// Number of fields successfully filled
    pub fields_filled: u32,
    /// Fields that could not be filled
    pub fields_skipped: Vec<SkippedFieldInfo>,
    /// Number of pages in output PDF
    pub output_page_count: u32,
    /// Path where PDF was saved (if output_path was specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for close_form
// ============================================================================

#[derive(Debug, Serialize, JsonSchema)]
pub struct CloseFormResult {
    pub session_id: String,
    /// False when no such session existed
    pub closed: bool,
}

// ============================================================================
// Request/Response types for list_pdfs
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPdfsParams {
    /// Directory to search for PDF files
    pub directory: String,
    /// Search subdirectories recursively (default: false)
    #[serde(default)]
    pub recursive: bool,
    /// Filename pattern to filter (e.g., "invoice*.pdf"). Supports glob patterns.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PdfFileInfo {
    /// Full path to the PDF file
    pub path: String,
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (ISO 8601 format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListPdfsResult {
    /// Directory that was searched
    pub directory: String,
    /// List of PDF files found
    pub files: Vec<PdfFileInfo>,
    /// Total number of files found
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl PdfFormServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new server with specified resource directories
    pub fn with_resource_dirs(dirs: Vec<String>) -> Self {
        Self::with_config(ServerConfig {
            resource_dirs: dirs,
            ..ServerConfig::default()
        })
    }

    /// Create a new server with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        let cache = CacheManager::new(config.cache_max_entries, config.cache_max_bytes);
        let sessions = SessionStore::new(config.max_sessions);
        Self {
            cache: Arc::new(cache),
            sessions: Arc::new(sessions),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Load a PDF form into a session
    #[tool(
        description = "Load a PDF with AcroForm fields into an editing session. Returns the session id, a generation number, every field classified by what it supports, and the editable controls.

Field kinds: text, checkbox, dropdown, multi_select_list, radio_group, button, unknown (edited as text).

Controls: one per field, except radio groups (one radio control per option, sharing a group) and buttons (none). Edit the controls and send them back with save_form together with the generation.

A PDF without form fields loads with status \"no_form_fields\"; that is a notice, not an error.

Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn load_form(&self, Parameters(params): Parameters<LoadFormParams>) -> String {
        let result = self.process_load_form(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "load_form failed");
            LoadFormResult {
                session_id: params.session_id.clone().unwrap_or_default(),
                generation: 0,
                source: Self::source_name(&params.source),
                status: LoadStatus::Error,
                message: None,
                fields: vec![],
                controls: vec![],
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Get the current form of a session
    #[tool(
        description = "Get the fields and controls of the form currently loaded in a session, reflecting any saves made so far."
    )]
    async fn get_form(&self, Parameters(params): Parameters<SessionParams>) -> String {
        let result = self.process_get_form(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "get_form failed");
            GetFormResult {
                session_id: params.session_id.clone(),
                generation: 0,
                source: None,
                fields: vec![],
                controls: vec![],
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Write edited controls back and save
    #[tool(
        description = "Apply edited controls to the session's form and save it as a new PDF named filled-form-<millis>.pdf.

- Only fields referenced by a control are touched; radio controls count only when checked.
- A field that cannot take its value is reported in fields_failed; the other fields are still saved.
- generation must match the current load, otherwise the save is refused as stale.
- The output is always cached (output_cache_key) so it can be reloaded with {\"cache_key\": ...} to verify."
    )]
    async fn save_form(&self, Parameters(params): Parameters<SaveFormParams>) -> String {
        let result = self.process_save_form(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "save_form failed");
            SaveFormResult {
                session_id: params.session_id.clone(),
                error: Some(e.client_message()),
                ..SaveFormResult::default()
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Fill a form in one call
    #[tool(
        description = "Fill form fields in a PDF and produce a new PDF in one call, without a session.

Each field_value entry specifies:
- name: The field name (use load_form to discover names)
- value: Text for text fields, or the option for radio groups, dropdowns and lists
- checked: Boolean (for checkboxes)

Fields are matched by name. Unknown names and radio values that match no option are reported as skipped.

The output is always cached (output_cache_key) for chaining with other tools.

Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn fill_form(&self, Parameters(params): Parameters<FillFormParams>) -> String {
        let result = self.process_fill_form(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "fill_form failed");
            FillFormResult {
                source: Self::source_name(&params.source),
                file_name: String::new(),
                output_cache_key: None,
                fields_filled: 0,
                fields_skipped: vec![],
                output_page_count: 0,
                output_path: None,
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Drop a session
    #[tool(description = "Close a form session and release its document.")]
    async fn close_form(&self, Parameters(params): Parameters<SessionParams>) -> String {
        let closed = self.sessions.remove(&params.session_id);
        tracing::debug!(session = %params.session_id, closed, "close_form");

        let result = CloseFormResult {
            session_id: params.session_id,
            closed,
        };
        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// List PDF files in a directory
    #[tool(
        description = "List PDF files in a directory. Useful for choosing a form to load.

Returns for each file:
- Full path (can be used directly as a {\"path\"} source)
- Filename
- File size in bytes
- Last modified time

Supports recursive search and glob pattern filtering."
    )]
    async fn list_pdfs(&self, Parameters(params): Parameters<ListPdfsParams>) -> String {
        let result = self.process_list_pdfs(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_pdfs failed");
            ListPdfsResult {
                directory: params.directory.clone(),
                files: vec![],
                total_count: 0,
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }
}

/// Run CPU-bound PDF work off the async runtime
async fn run_blocking<T, F>(f: F) -> crate::error::Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::TaskJoin {
            reason: e.to_string(),
        })?
}

fn page_count_or_zero(data: &[u8]) -> u32 {
    QpdfWrapper::get_page_count(data, None).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not count pages of saved PDF");
        0
    })
}

impl PdfFormServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Path { path } => path.clone(),
            PdfSource::Base64 { .. } => "<base64>".to_string(),
            PdfSource::CacheRef { cache_key } => format!("<cache:{}>", cache_key),
        }
    }

    fn resolve_source(&self, source: &PdfSource) -> crate::error::Result<ResolvedPdf> {
        match source {
            PdfSource::Path { path } => {
                let path = self.validate_path_access(path)?;
                resolve_path(path)
            }
            PdfSource::Base64 { base64 } => resolve_base64(base64),
            PdfSource::CacheRef { cache_key } => resolve_cache(cache_key, &self.cache),
        }
    }

    fn is_inside_resource_dirs(&self, canonical: &Path) -> bool {
        self.config.resource_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|cd| canonical.starts_with(&cd))
                .unwrap_or(false)
        })
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let denied = || Error::PathAccessDenied {
            path: path.to_string(),
        };
        let canonical = std::fs::canonicalize(path).map_err(|_| denied())?;

        if self.is_inside_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(denied())
        }
    }

    /// Resolve where an output goes: an existing directory receives
    /// `file_name`, anything else is taken as the file path.
    fn output_target(&self, path: &str, file_name: &str) -> crate::error::Result<PathBuf> {
        let requested = Path::new(path);
        let target = if requested.is_dir() {
            requested.join(file_name)
        } else {
            requested.to_path_buf()
        };

        if self.config.resource_dirs.is_empty() {
            return Ok(target);
        }

        // The file may not exist yet; canonicalize its parent
        let denied = || Error::PathAccessDenied {
            path: path.to_string(),
        };
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file = target.file_name().ok_or_else(denied)?;
        let canonical = std::fs::canonicalize(parent)
            .map_err(|_| denied())?
            .join(file);

        if self.is_inside_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(denied())
        }
    }

    /// Write output data, with sandbox validation.
    fn write_output(
        &self,
        output_path: Option<&str>,
        file_name: &str,
        data: &[u8],
    ) -> crate::error::Result<Option<String>> {
        let Some(path_str) = output_path else {
            return Ok(None);
        };

        let target = self.output_target(path_str, file_name)?;
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&target, data)?;
        tracing::info!(path = %target.display(), size = data.len(), "wrote filled form");
        Ok(Some(target.to_string_lossy().into_owned()))
    }

    pub async fn process_load_form(
        &self,
        params: &LoadFormParams,
    ) -> crate::error::Result<LoadFormResult> {
        // A source that cannot be read never touches the session
        let resolved = self.resolve_source(&params.source)?;

        let (session_id, session) = self.sessions.get_or_create(params.session_id.as_deref())?;
        let guard = SessionStore::acquire(&session_id, &session)?;

        let source_name = resolved.source_name.clone();
        let password = params.password.clone();

        let (generation, outcome, fields, controls) = run_blocking(move || {
            let mut session = guard;
            let outcome = session.load(&resolved.data, password.as_deref(), resolved.source_name);
            let generation = session.generation();
            let (fields, controls) = match session.form_mut() {
                Some(form) => {
                    let model = form.form_model();
                    (form.records().to_vec(), model.controls)
                }
                None => (Vec::new(), Vec::new()),
            };
            Ok((generation, outcome, fields, controls))
        })
        .await?;

        let (status, message, error) = match outcome {
            Ok(()) => (LoadStatus::Ready, None, None),
            Err(e) if e.is_notice() => {
                tracing::info!(source = %source_name, "PDF has no form fields");
                (LoadStatus::NoFormFields, Some(e.client_message()), None)
            }
            Err(e) => {
                tracing::warn!(source = %source_name, error = %e, "failed to load form");
                (LoadStatus::Error, None, Some(e.client_message()))
            }
        };

        Ok(LoadFormResult {
            session_id,
            generation,
            source: source_name,
            status,
            message,
            fields,
            controls,
            error,
        })
    }

    pub fn process_get_form(&self, params: &SessionParams) -> crate::error::Result<GetFormResult> {
        let session = self.sessions.get(&params.session_id)?;
        let mut session = SessionStore::acquire(&params.session_id, &session)?;

        let generation = session.generation();
        let source = session.source_name().map(str::to_string);
        let form = session.form_mut().ok_or(Error::NoDocumentLoaded)?;
        let controls = form.form_model().controls;

        Ok(GetFormResult {
            session_id: params.session_id.clone(),
            generation,
            source,
            fields: form.records().to_vec(),
            controls,
            error: None,
        })
    }

    pub async fn process_save_form(
        &self,
        params: &SaveFormParams,
    ) -> crate::error::Result<SaveFormResult> {
        let session = self.sessions.get(&params.session_id)?;
        let guard = SessionStore::acquire(&params.session_id, &session)?;

        let generation = params.generation;
        let controls = params.controls.clone();

        let (saved, written_names, output_page_count) = run_blocking(move || {
            let mut session = guard;
            let saved = session.save(generation, &controls)?;
            let records = session
                .form()
                .map(|form| form.records())
                .unwrap_or_default();
            let written_names = saved
                .report
                .written
                .iter()
                .filter_map(|&i| records.get(i).map(|r| r.name.clone()))
                .collect::<Vec<_>>();
            let page_count = page_count_or_zero(&saved.bytes);
            Ok((saved, written_names, page_count))
        })
        .await?;

        let output_path =
            self.write_output(params.output_path.as_deref(), &saved.file_name, &saved.bytes)?;
        let base64 = params
            .include_base64
            .then(|| base64::engine::general_purpose::STANDARD.encode(&saved.bytes));
        let size = saved.bytes.len();
        let output_cache_key = self.cache.insert(saved.file_name.clone(), saved.bytes);

        let fields_failed = saved
            .report
            .failed
            .into_iter()
            .map(|f| FailedFieldInfo {
                name: f.name,
                reason: f.reason,
            })
            .collect();

        Ok(SaveFormResult {
            session_id: params.session_id.clone(),
            file_name: saved.file_name,
            output_cache_key,
            size,
            output_page_count,
            fields_written: written_names,
            fields_failed,
            output_path,
            base64,
            error: None,
        })
    }

    pub async fn process_fill_form(
        &self,
        params: &FillFormParams,
    ) -> crate::error::Result<FillFormResult> {
        let resolved = self.resolve_source(&params.source)?;
        let source_name = resolved.source_name.clone();
        let data = resolved.data;
        let password = params.password.clone();
        let field_values = params.field_values.clone();

        let (saved, unapplied, output_page_count) = run_blocking(move || {
            let mut form = load_document(&data, password.as_deref())?;
            let mut model = form.form_model();

            let unapplied = model.with_field_values(
                field_values
                    .iter()
                    .map(|f| (f.name.as_str(), f.value.as_deref(), f.checked)),
            );

            let rejected: HashSet<&str> = unapplied.iter().map(|u| u.name.as_str()).collect();
            let named: HashSet<&str> = field_values
                .iter()
                .map(|f| f.name.as_str())
                .filter(|name| !rejected.contains(name))
                .collect();
            let controls: Vec<ControlState> = model
                .controls
                .iter()
                .filter(|c| named.contains(c.label.as_str()))
                .map(|c| c.state.clone())
                .collect();

            let saved = form.save(&controls)?;
            let page_count = page_count_or_zero(&saved.bytes);
            Ok((saved, unapplied, page_count))
        })
        .await?;

        let output_path =
            self.write_output(params.output_path.as_deref(), &saved.file_name, &saved.bytes)?;
        let output_cache_key = self.cache.insert(saved.file_name.clone(), saved.bytes);

        let fields_filled = saved.report.written_count();
        let mut fields_skipped: Vec<SkippedFieldInfo> = unapplied
            .into_iter()
            .map(|miss| SkippedFieldInfo {
                name: miss.name,
                reason: miss.reason,
            })
            .collect();
        fields_skipped.extend(saved.report.failed.into_iter().map(|f| SkippedFieldInfo {
            name: f.name,
            reason: f.reason,
        }));

        Ok(FillFormResult {
            source: source_name,
            file_name: saved.file_name,
            output_cache_key,
            fields_filled,
            fields_skipped,
            output_page_count,
            output_path,
            error: None,
        })
    }

    fn process_list_pdfs(&self, params: &ListPdfsParams) -> crate::error::Result<ListPdfsResult> {
        let dir_path = self.validate_path_access(&params.directory)?;

        if !dir_path.is_dir() {
            return Err(Error::PdfNotFound {
                path: params.directory.clone(),
            });
        }

        let pattern = params
            .pattern
            .as_ref()
            .and_then(|p| glob::Pattern::new(p).ok());

        let mut files = Vec::new();
        Self::collect_pdfs(&dir_path, params.recursive, pattern.as_ref(), &mut files)?;

        // Sort by path for consistent ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let total_count = files.len() as u32;

        Ok(ListPdfsResult {
            directory: params.directory.clone(),
            files,
            total_count,
            error: None,
        })
    }

    fn collect_pdfs(
        dir: &Path,
        recursive: bool,
        pattern: Option<&glob::Pattern>,
        files: &mut Vec<PdfFileInfo>,
    ) -> crate::error::Result<()> {
        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    if let Err(e) = Self::collect_pdfs(&path, recursive, pattern, files) {
                        tracing::debug!(dir = %path.display(), error = %e, "skipping unreadable directory");
                    }
                }
                continue;
            }

            let is_pdf = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
            if !path.is_file() || !is_pdf {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if pattern.is_some_and(|pat| !pat.matches(&name)) {
                continue;
            }

            let metadata = std::fs::metadata(&path).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let modified = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

            files.push(PdfFileInfo {
                path: path.to_string_lossy().into_owned(),
                name,
                size,
                modified,
            });
        }

        Ok(())
    }

    /// Field records of a PDF, as served by read_resource
    async fn resource_records(&self, path: &str) -> crate::error::Result<Vec<FieldRecord>> {
        let resolved = resolve_path(self.validate_path_access(path)?)?;
        run_blocking(move || match load_document(&resolved.data, None) {
            Ok(form) => Ok(form.records().to_vec()),
            Err(e) if e.is_notice() => Ok(Vec::new()),
            Err(e) => Err(e),
        })
        .await
    }
}

impl Default for PdfFormServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for PdfFormServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF form bridge: load_form a PDF, edit the returned controls, then save_form \
                 with the same generation. fill_form does all three in one call. PDF files in \
                 configured directories are exposed as resources listing their form fields."
                    .into(),
            ),
        }
    }

    /// List available PDF resources from configured directories
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut resources = Vec::new();

        for dir in self.config.resource_dirs.iter() {
            let params = ListPdfsParams {
                directory: dir.clone(),
                recursive: true,
                pattern: None,
            };

            let list_result = match self.process_list_pdfs(&params) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(dir = %dir, error = %e, "cannot list resource directory");
                    continue;
                }
            };

            for file in list_result.files {
                let uri = format!("file://{}", file.path);
                let mut resource = RawResource::new(uri, file.name.clone());
                resource.mime_type = Some("application/pdf".to_string());
                resource.description = Some(format!("PDF form ({} bytes)", file.size));
                resource.size = Some(file.size as u32);

                resources.push(Annotated {
                    raw: resource,
                    annotations: None,
                });
            }
        }

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Read a PDF resource and return its classified form fields as JSON
    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = &request.uri;

        let Some(path) = uri.strip_prefix("file://") else {
            return Err(ErrorData::invalid_params(
                "Only file:// URIs are supported",
                None,
            ));
        };

        match self.resource_records(path).await {
            Ok(records) => {
                let text = serde_json::to_string_pretty(&records)
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: uri.clone(),
                        mime_type: Some("application/json".to_string()),
                        text,
                        meta: Default::default(),
                    }],
                })
            }
            Err(e @ Error::PathAccessDenied { .. }) => {
                tracing::warn!(error = %e, "read_resource denied");
                Err(ErrorData::invalid_params(
                    "Resource not found in configured directories",
                    None,
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "read_resource failed");
                Err(ErrorData::internal_error(e.client_message(), None))
            }
        }
    }
}

/// Run the MCP server without resource directories
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server with specified resource directories
pub async fn run_server_with_dirs(resource_dirs: Vec<String>) -> Result<()> {
    run_server_with_config(ServerConfig {
        resource_dirs,
        ..ServerConfig::default()
    })
    .await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    tracing::info!(
        resource_dirs = ?config.resource_dirs,
        max_sessions = config.max_sessions,
        "PDF form bridge ready, waiting for connections..."
    );

    let server = PdfFormServer::with_config(config);
    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
