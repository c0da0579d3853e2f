//! Caddyfile import sessions.
//!
//! A session is either a persisted row or an ephemeral source on disk (an
//! uploaded file or the mounted Caddyfile). Uploads never create rows; a
//! row is written when a session is committed, so every committed import
//! is recorded no matter where it came from.
//!
//! Upload layout below the import directory:
//!
//! ```text
//! uploads/<uuid>.caddyfile          single-file upload
//! uploads/<uuid>/...                multi-file upload
//! uploads/<uuid>/.import-root       relative path of the root file
//! backups/<file name>               copy of the mounted Caddyfile
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gatehouse_caddy::caddyfile::CaddyfileError;
use gatehouse_core::caddy_import::{detect_imports, ParseResult, ParsedHost};
use gatehouse_core::error::CoreError;
use gatehouse_core::import_session::{
    is_source_eligible, SessionStatus, SESSION_STATUS_TRANSIENT,
};
use gatehouse_core::reconcile::{reconcile, ConflictEntry, ConflictReport, HostSnapshot};
use gatehouse_core::resolution::{renamed_domain, Resolution};
use gatehouse_core::types::{DbId, Timestamp};
use gatehouse_core::upload_path::{clean_relative_path, plan_upload, UploadFile, UploadPlan};
use gatehouse_db::models::import_session::{CommitRecord, CreateImportSession, ImportSession};
use gatehouse_db::models::proxy_host::{CreateProxyHost, ProxyHost};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::convert::convert_to_proxy_hosts;
use crate::error::{PipelineError, StoreError};
use crate::hosts::{push_live, validate_host_fields};
use crate::store::{ConfigApplier, ConfigParser, ImportSessionStore, ProxyHostStore};

pub const UPLOADS_DIR: &str = "uploads";
pub const BACKUPS_DIR: &str = "backups";
pub const UPLOAD_EXTENSION: &str = "caddyfile";
/// Marker file inside a multi-file upload naming its root file.
pub const ROOT_MARKER_FILE: &str = ".import-root";

const SESSION_ENTITY: &str = "ImportSession";

/// Where import files live.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub import_dir: PathBuf,
    /// Caddyfile mounted into the container, offered for import on start.
    pub mounted_caddyfile: Option<PathBuf>,
}

impl ImportConfig {
    pub fn new(import_dir: impl Into<PathBuf>) -> Self {
        Self {
            import_dir: import_dir.into(),
            mounted_caddyfile: None,
        }
    }

    pub fn with_mounted_caddyfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounted_caddyfile = Some(path.into());
        self
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.import_dir.join(UPLOADS_DIR)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.import_dir.join(BACKUPS_DIR)
    }

    fn upload_file(&self, uuid: Uuid) -> PathBuf {
        self.uploads_dir().join(format!("{uuid}.{UPLOAD_EXTENSION}"))
    }

    fn upload_dir(&self, uuid: Uuid) -> PathBuf {
        self.uploads_dir().join(uuid.to_string())
    }
}

// ── DTOs ─────────────────────────────────────────────────────────────

/// Session descriptor returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub uuid: Uuid,
    /// A persisted status name, or `transient` for sessions without a row.
    pub status: String,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl SessionInfo {
    fn transient(uuid: Uuid, path: &Path) -> Self {
        Self {
            uuid,
            status: SESSION_STATUS_TRANSIENT.to_string(),
            source_file: path_key(path),
            created_at: None,
        }
    }

    fn persisted(row: &ImportSession) -> Result<Self, CoreError> {
        Ok(Self {
            uuid: row.uuid,
            status: row.status()?.as_str().to_string(),
            source_file: row.source_file.clone(),
            created_at: Some(row.created_at),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatus {
    pub has_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportPreview {
    pub session: SessionInfo,
    pub preview: ParseResult,
    /// Raw text of the root file, when still available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caddyfile_content: Option<String>,
    pub conflict_details: BTreeMap<String, ConflictEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectImportsResult {
    pub has_imports: bool,
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRequest {
    pub session_uuid: Uuid,
    /// Domain -> resolution. Candidates without an entry are created.
    #[serde(default)]
    pub resolutions: BTreeMap<String, Resolution>,
    /// Domain -> display name override.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

// ── Session sources ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Upload,
    Mounted,
}

#[derive(Debug)]
enum SessionSource {
    Persisted(ImportSession),
    Ephemeral {
        uuid: Uuid,
        path: PathBuf,
        origin: Origin,
    },
}

impl SessionSource {
    fn uuid(&self) -> Uuid {
        match self {
            SessionSource::Persisted(row) => row.uuid,
            SessionSource::Ephemeral { uuid, .. } => *uuid,
        }
    }
}

fn path_key(path: &Path) -> String {
    path.display().to_string()
}

fn not_found(uuid: Uuid) -> PipelineError {
    CoreError::not_found(SESSION_ENTITY, uuid).into()
}

fn snapshots(hosts: &[ProxyHost]) -> Vec<HostSnapshot> {
    hosts.iter().map(ProxyHost::snapshot).collect()
}

/// Parse-error text safe to show for operator-supplied content: file
/// paths are shown relative to the upload.
fn describe_upload_parse_error(err: &CaddyfileError, base: &Path) -> String {
    let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let relative = |file: &str| {
        let path = Path::new(file);
        path.strip_prefix(&base)
            .ok()
            .or_else(|| path.file_name().map(Path::new))
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| file.to_string())
    };
    match err {
        CaddyfileError::Syntax {
            file,
            line,
            message,
        } => format!("{}:{line}: {message}", relative(file)),
        CaddyfileError::Io { path, .. } => format!("could not read {}", relative(path)),
    }
}

// ── Service ──────────────────────────────────────────────────────────

/// Orchestrates upload, preview, commit and cancel of import sessions.
pub struct ImportService {
    config: ImportConfig,
    sessions: Arc<dyn ImportSessionStore>,
    hosts: Arc<dyn ProxyHostStore>,
    parser: Arc<dyn ConfigParser>,
    applier: Arc<dyn ConfigApplier>,
}

impl ImportService {
    pub fn new(
        config: ImportConfig,
        sessions: Arc<dyn ImportSessionStore>,
        hosts: Arc<dyn ProxyHostStore>,
        parser: Arc<dyn ConfigParser>,
        applier: Arc<dyn ConfigApplier>,
    ) -> Self {
        Self {
            config,
            sessions,
            hosts,
            parser,
            applier,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Reconcile session state with the mounted Caddyfile at startup.
    ///
    /// A missing file abandons its open sessions. A present file is copied
    /// to the backups directory and otherwise offered lazily through
    /// [`status`](Self::status) and [`preview`](Self::preview).
    pub async fn detect_on_start(&self) -> Result<(), PipelineError> {
        let Some(mounted) = &self.config.mounted_caddyfile else {
            return Ok(());
        };

        if !tokio::fs::try_exists(mounted).await.unwrap_or(false) {
            let abandoned = self
                .sessions
                .abandon_open_for_source(&path_key(mounted))
                .await?;
            if abandoned > 0 {
                tracing::info!(
                    path = %mounted.display(),
                    abandoned,
                    "Mounted Caddyfile is gone; abandoned open import sessions",
                );
            }
            return Ok(());
        }

        if let Some(name) = mounted.file_name() {
            let backups = self.config.backups_dir();
            let target = backups.join(name);
            let copied = match tokio::fs::create_dir_all(&backups).await {
                Ok(()) => tokio::fs::copy(mounted, &target).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = copied {
                tracing::warn!(
                    path = %mounted.display(),
                    backup = %target.display(),
                    error = %e,
                    "Failed to back up mounted Caddyfile",
                );
            }
        }

        tracing::info!(path = %mounted.display(), "Mounted Caddyfile available for import");
        Ok(())
    }

    /// Whether an import is waiting for review.
    pub async fn status(&self) -> Result<ImportStatus, PipelineError> {
        if let Some(row) = self.sessions.find_open().await? {
            return Ok(ImportStatus {
                has_pending: true,
                session: Some(SessionInfo::persisted(&row)?),
            });
        }
        if let Some(path) = self.mounted_candidate().await? {
            return Ok(ImportStatus {
                has_pending: true,
                session: Some(SessionInfo::transient(Uuid::new_v4(), &path)),
            });
        }
        Ok(ImportStatus {
            has_pending: false,
            session: None,
        })
    }

    /// Preview a session. Without an id, the open persisted session or the
    /// mounted Caddyfile is previewed.
    pub async fn preview(&self, session_uuid: Option<Uuid>) -> Result<ImportPreview, PipelineError> {
        let row = match session_uuid {
            Some(uuid) => self.sessions.find_by_uuid(uuid).await?,
            None => self.sessions.find_open().await?,
        };

        if let Some(row) = row {
            if !row.status()?.is_open() {
                return Err(not_found(row.uuid));
            }
            return self.preview_persisted(row).await;
        }

        let uuid = session_uuid.unwrap_or_else(Uuid::new_v4);
        if session_uuid.is_some() {
            if let Some(path) = self.find_upload(uuid).await? {
                return self.preview_path(uuid, &path).await;
            }
        }
        if let Some(path) = self.mounted_candidate().await? {
            return self.preview_path(uuid, &path).await;
        }

        Err(CoreError::NotFound {
            entity: SESSION_ENTITY,
            id: session_uuid.map_or_else(|| "pending".to_string(), |u| u.to_string()),
        }
        .into())
    }

    /// Store a single uploaded Caddyfile and preview it. No session row is
    /// created.
    pub async fn upload(
        &self,
        content: &str,
        filename: Option<&str>,
    ) -> Result<ImportPreview, PipelineError> {
        if content.trim().is_empty() {
            return Err(CoreError::Validation("Caddyfile content is required".into()).into());
        }

        let uuid = Uuid::new_v4();
        let uploads = self.config.uploads_dir();
        tokio::fs::create_dir_all(&uploads)
            .await
            .map_err(|e| PipelineError::io(&uploads, e))?;
        let path = self.config.upload_file(uuid);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| PipelineError::io(&path, e))?;

        let mut result = match self.parser.import_file(&path) {
            Ok(result) => result,
            Err(e) => {
                self.remove_upload_quietly(uuid).await;
                return Err(CoreError::Validation(format!(
                    "Failed to parse Caddyfile: {}",
                    describe_upload_parse_error(&e, &uploads)
                ))
                .into());
            }
        };
        let report = self.reconcile(&mut result).await?;

        tracing::info!(
            session_uuid = %uuid,
            filename = filename.unwrap_or(""),
            hosts = result.hosts.len(),
            conflicts = report.domains.len(),
            "Caddyfile uploaded",
        );

        Ok(ImportPreview {
            session: SessionInfo::transient(uuid, &path),
            preview: result,
            caddyfile_content: Some(content.to_string()),
            conflict_details: report.details,
        })
    }

    /// Store a set of files (a root Caddyfile plus the files it imports)
    /// and preview the root. Every filename is checked before anything is
    /// written.
    pub async fn upload_multi(&self, files: &[UploadFile]) -> Result<ImportPreview, PipelineError> {
        let plan = plan_upload(files)?;
        if let Some((path, _)) = plan
            .files
            .iter()
            .find(|(path, _)| path == Path::new(ROOT_MARKER_FILE))
        {
            return Err(CoreError::Validation(format!(
                "Invalid filename '{}': reserved name",
                path.display()
            ))
            .into());
        }

        let uuid = Uuid::new_v4();
        let dir = self.config.upload_dir(uuid);
        if let Err(e) = write_upload(&dir, &plan).await {
            self.remove_upload_quietly(uuid).await;
            return Err(e);
        }

        let root_path = dir.join(&plan.root);
        let mut result = match self.parser.import_file(&root_path) {
            Ok(result) => result,
            Err(e) => {
                self.remove_upload_quietly(uuid).await;
                return Err(CoreError::Validation(format!(
                    "Failed to parse Caddyfile: {}",
                    describe_upload_parse_error(&e, &dir)
                ))
                .into());
            }
        };
        let report = self.reconcile(&mut result).await?;

        let root_content = plan
            .files
            .iter()
            .find(|(path, _)| *path == plan.root)
            .map(|(_, content)| content.to_string());

        tracing::info!(
            session_uuid = %uuid,
            files = plan.files.len(),
            root = %plan.root.display(),
            hosts = result.hosts.len(),
            "Multi-file Caddyfile uploaded",
        );

        Ok(ImportPreview {
            session: SessionInfo::transient(uuid, &root_path),
            preview: result,
            caddyfile_content: root_content,
            conflict_details: report.details,
        })
    }

    /// Scan raw Caddyfile text for `import` directives.
    pub fn detect_imports(content: &str) -> DetectImportsResult {
        let imports = detect_imports(content);
        DetectImportsResult {
            has_imports: !imports.is_empty(),
            imports,
        }
    }

    /// Apply the operator's resolutions and record the session as
    /// committed.
    pub async fn commit(&self, req: &CommitRequest) -> Result<CommitResult, PipelineError> {
        // Everything that can fail without side effects runs before the
        // claim, so a failed commit leaves the session committable.
        let source = self.locate(req.session_uuid).await?;
        let mut result = self.load_parse_result(&source)?;
        let existing = self.hosts.list().await?;
        let source = self.claim(source).await?;
        let uuid = source.uuid();

        result.conflicts.clear();
        let report = reconcile(&mut result, &snapshots(&existing));

        let mut outcome = CommitResult::default();
        let mut created_ids: Vec<DbId> = Vec::new();
        let dtos = convert_to_proxy_hosts(&result.hosts);
        for (candidate, dto) in result.hosts.iter().zip(dtos) {
            self.commit_host(candidate, dto, req, &existing, &mut outcome, &mut created_ids)
                .await;
        }

        if outcome.created + outcome.updated > 0 {
            if let Err(e) = push_live(self.hosts.as_ref(), self.applier.as_ref()).await {
                tracing::error!(session_uuid = %uuid, error = %e, "Live apply failed after import");
                for id in &created_ids {
                    if let Err(del_err) = self.hosts.delete(*id).await {
                        tracing::error!(
                            host_id = id,
                            error = %del_err,
                            "Failed to roll back imported host",
                        );
                    }
                }
                outcome.errors.push(format!(
                    "Failed to apply configuration to Caddy: {e}. {} created host(s) were removed; {} updated host(s) were kept",
                    created_ids.len(),
                    outcome.updated,
                ));
                outcome.created = 0;
            }
        }

        let record = CommitRecord {
            parsed_data: serde_json::to_value(&result)?,
            conflict_report: serde_json::to_value(&report.domains)?,
            user_resolutions: serde_json::to_value(&req.resolutions)?,
            error_msg: (!outcome.errors.is_empty()).then(|| outcome.errors.join("\n")),
        };
        if self.sessions.record_commit(uuid, &record).await?.is_none() {
            tracing::warn!(session_uuid = %uuid, "Committed session row disappeared before recording");
        }

        if let SessionSource::Ephemeral {
            origin: Origin::Upload,
            ..
        } = source
        {
            self.remove_upload_quietly(uuid).await;
        }

        tracing::info!(
            session_uuid = %uuid,
            created = outcome.created,
            updated = outcome.updated,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            "Import committed",
        );
        Ok(outcome)
    }

    /// Reject an open session or discard an uploaded one.
    pub async fn cancel(&self, session_uuid: Uuid) -> Result<(), PipelineError> {
        if let Some(row) = self.sessions.find_by_uuid(session_uuid).await? {
            let status = row.status()?;
            if !status.is_open() {
                return Err(CoreError::Conflict(format!("Import session is already {status}")).into());
            }
            self.sessions
                .transition_status(session_uuid, &SessionStatus::OPEN, SessionStatus::Rejected)
                .await?
                .ok_or_else(|| {
                    CoreError::Conflict("Import session changed while cancelling".into())
                })?;
            tracing::info!(session_uuid = %session_uuid, "Import session rejected");
            return Ok(());
        }

        if self.remove_upload(session_uuid).await? {
            tracing::info!(session_uuid = %session_uuid, "Uploaded import discarded");
            return Ok(());
        }

        Err(not_found(session_uuid))
    }

    // ---- private helpers ----

    /// The mounted Caddyfile, if it exists and has not been committed
    /// since it was last modified.
    async fn mounted_candidate(&self) -> Result<Option<PathBuf>, PipelineError> {
        let Some(mounted) = &self.config.mounted_caddyfile else {
            return Ok(None);
        };
        let metadata = match tokio::fs::metadata(mounted).await {
            Ok(m) if m.is_file() => m,
            _ => return Ok(None),
        };
        let modified: Timestamp = metadata
            .modified()
            .map_err(|e| PipelineError::io(mounted, e))?
            .into();
        let last_committed = self
            .sessions
            .latest_committed_at(&path_key(mounted))
            .await?;
        Ok(is_source_eligible(modified, last_committed).then(|| mounted.clone()))
    }

    /// Root file of an uploaded session, if one exists for `uuid`.
    async fn find_upload(&self, uuid: Uuid) -> Result<Option<PathBuf>, PipelineError> {
        let file = self.config.upload_file(uuid);
        if tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Ok(Some(file));
        }

        let dir = self.config.upload_dir(uuid);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(None);
        }
        let marker = dir.join(ROOT_MARKER_FILE);
        let root = tokio::fs::read_to_string(&marker)
            .await
            .map_err(|e| PipelineError::io(&marker, e))?;
        let root = clean_relative_path(root.trim())
            .map_err(|e| CoreError::Internal(format!("Corrupt upload root marker: {e}")))?;
        Ok(Some(dir.join(root)))
    }

    /// Find the commit target for `uuid` without changing anything.
    async fn locate(&self, uuid: Uuid) -> Result<SessionSource, PipelineError> {
        if let Some(row) = self.sessions.find_by_uuid(uuid).await? {
            if row.status()? != SessionStatus::Reviewing {
                return Err(not_found(uuid));
            }
            return Ok(SessionSource::Persisted(row));
        }

        if let Some(path) = self.find_upload(uuid).await? {
            return Ok(SessionSource::Ephemeral {
                uuid,
                path,
                origin: Origin::Upload,
            });
        }
        if let Some(path) = self.mounted_candidate().await? {
            return Ok(SessionSource::Ephemeral {
                uuid,
                path,
                origin: Origin::Mounted,
            });
        }
        Err(not_found(uuid))
    }

    /// Mark a located session committed so a concurrent commit of the same
    /// session finds nothing. Persisted rows move `reviewing -> committed`;
    /// ephemeral sources get a new committed row keyed by their uuid.
    async fn claim(&self, source: SessionSource) -> Result<SessionSource, PipelineError> {
        match source {
            SessionSource::Persisted(row) => {
                let uuid = row.uuid;
                let claimed = self
                    .sessions
                    .transition_status(uuid, &[SessionStatus::Reviewing], SessionStatus::Committed)
                    .await?
                    .ok_or_else(|| not_found(uuid))?;
                Ok(SessionSource::Persisted(claimed))
            }
            SessionSource::Ephemeral { uuid, path, origin } => {
                let claim = CreateImportSession {
                    uuid,
                    source_file: path_key(&path),
                    status: SessionStatus::Committed,
                    parsed_data: None,
                    conflict_report: None,
                    user_resolutions: None,
                    error_msg: None,
                };
                match self.sessions.create(&claim).await {
                    Ok(_) => Ok(SessionSource::Ephemeral { uuid, path, origin }),
                    Err(StoreError::Conflict(_)) => Err(not_found(uuid)),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn load_parse_result(&self, source: &SessionSource) -> Result<ParseResult, PipelineError> {
        match source {
            SessionSource::Persisted(row) => self.stored_parse_result(row),
            SessionSource::Ephemeral { path, .. } => self.parse(path),
        }
    }

    /// Parse data recorded on a row, re-parsing its source if none was
    /// stored.
    fn stored_parse_result(&self, row: &ImportSession) -> Result<ParseResult, PipelineError> {
        match &row.parsed_data {
            Some(data) => Ok(serde_json::from_value(data.clone())?),
            None => self.parse(Path::new(&row.source_file)),
        }
    }

    fn parse(&self, path: &Path) -> Result<ParseResult, PipelineError> {
        self.parser
            .import_file(path)
            .map_err(|source| PipelineError::Parse {
                path: path_key(path),
                source,
            })
    }

    async fn reconcile(&self, result: &mut ParseResult) -> Result<ConflictReport, PipelineError> {
        let existing = self.hosts.list().await?;
        Ok(reconcile(result, &snapshots(&existing)))
    }

    async fn preview_persisted(&self, mut row: ImportSession) -> Result<ImportPreview, PipelineError> {
        let mut result = self.stored_parse_result(&row)?;
        result.conflicts.clear();
        let report = self.reconcile(&mut result).await?;

        if row.status()? == SessionStatus::Pending {
            match self
                .sessions
                .transition_status(row.uuid, &[SessionStatus::Pending], SessionStatus::Reviewing)
                .await?
            {
                Some(updated) => row = updated,
                None => {
                    if let Some(current) = self.sessions.find_by_uuid(row.uuid).await? {
                        row = current;
                    }
                }
            }
        }

        let content = self.read_source_text(Path::new(&row.source_file)).await;
        Ok(ImportPreview {
            session: SessionInfo::persisted(&row)?,
            preview: result,
            caddyfile_content: content,
            conflict_details: report.details,
        })
    }

    async fn preview_path(&self, uuid: Uuid, path: &Path) -> Result<ImportPreview, PipelineError> {
        let mut result = self.parse(path)?;
        let report = self.reconcile(&mut result).await?;
        Ok(ImportPreview {
            session: SessionInfo::transient(uuid, path),
            preview: result,
            caddyfile_content: self.read_source_text(path).await,
            conflict_details: report.details,
        })
    }

    /// Raw text of a source file, falling back to its backup copy.
    async fn read_source_text(&self, path: &Path) -> Option<String> {
        if let Ok(text) = tokio::fs::read_to_string(path).await {
            return Some(text);
        }
        let backup = self.config.backups_dir().join(path.file_name()?);
        tokio::fs::read_to_string(backup).await.ok()
    }

    async fn commit_host(
        &self,
        candidate: &ParsedHost,
        mut dto: CreateProxyHost,
        req: &CommitRequest,
        existing: &[ProxyHost],
        outcome: &mut CommitResult,
        created_ids: &mut Vec<DbId>,
    ) {
        let domain = &candidate.domain_names;
        let resolution = req.resolutions.get(domain).copied();
        if resolution.is_some_and(Resolution::is_skip) {
            outcome.skipped += 1;
            return;
        }

        if resolution == Some(Resolution::Rename) {
            dto.domain_names = renamed_domain(domain);
            dto.name = dto.domain_names.clone();
        }
        let name_override = req.names.get(domain);
        if let Some(name) = name_override {
            dto.name = name.clone();
        }

        if let Err(e) = validate_host_fields(
            &dto.domain_names,
            &dto.forward_scheme,
            &dto.forward_host,
            dto.forward_port,
        ) {
            outcome.errors.push(format!("{domain}: {e}"));
            return;
        }

        if resolution == Some(Resolution::Overwrite) {
            if let Some(current) = existing.iter().find(|h| h.domain_names == *domain) {
                if name_override.is_none() {
                    dto.name = current.name.clone();
                }
                let mut host = current.clone();
                host.apply_fields(&dto);
                match self.hosts.update(&host).await {
                    Ok(Some(_)) => outcome.updated += 1,
                    Ok(None) => outcome
                        .errors
                        .push(format!("{domain}: existing host was removed during import")),
                    Err(e) => outcome.errors.push(format!("{domain}: {e}")),
                }
                return;
            }
        }

        match self.hosts.create(&dto).await {
            Ok(host) => {
                outcome.created += 1;
                created_ids.push(host.id);
            }
            Err(e) => outcome.errors.push(format!("{domain}: {e}")),
        }
    }

    /// Remove an uploaded file or directory. `Ok(false)` if there was none.
    async fn remove_upload(&self, uuid: Uuid) -> Result<bool, PipelineError> {
        let file = self.config.upload_file(uuid);
        if tokio::fs::try_exists(&file).await.unwrap_or(false) {
            tokio::fs::remove_file(&file)
                .await
                .map_err(|e| PipelineError::io(&file, e))?;
            return Ok(true);
        }
        let dir = self.config.upload_dir(uuid);
        if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| PipelineError::io(&dir, e))?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn remove_upload_quietly(&self, uuid: Uuid) {
        if let Err(e) = self.remove_upload(uuid).await {
            tracing::warn!(session_uuid = %uuid, error = %e, "Failed to remove uploaded files");
        }
    }
}

async fn write_upload(dir: &Path, plan: &UploadPlan<'_>) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))?;
    for (relative, content) in &plan.files {
        let target = dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| PipelineError::io(&target, e))?;
    }
    let marker = dir.join(ROOT_MARKER_FILE);
    tokio::fs::write(&marker, plan.root.to_string_lossy().into_owned())
        .await
        .map_err(|e| PipelineError::io(&marker, e))
}
