// intake-core/src/application/process_file.rs

use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info, instrument, warn};

use super::context::RequestContext;
use crate::domain::file::{FileMetadata, ParsedData};
use crate::error::IntakeError;
use crate::ports::{ByteStream, FileParser, FileRepository, Storage};

/// Parse-error rows echoed to the log before the rest is summarised.
const LOGGED_PARSE_ERRORS: usize = 10;

#[derive(Debug, Clone)]
pub struct ProcessFileRequest {
    pub file_id: String,
    /// Storage path. Empty means the path recorded in the file metadata.
    pub file_path: String,
}

impl ProcessFileRequest {
    pub fn new(file_id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_path: file_path.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessFileResponse {
    pub file_id: String,
    pub parsed_data: Option<ParsedData>,
    pub record_count: usize,
    pub success: bool,
    pub error: Option<String>,
}

impl ProcessFileResponse {
    fn failed(file_id: &str, message: String) -> Self {
        Self {
            file_id: file_id.to_string(),
            parsed_data: None,
            record_count: 0,
            success: false,
            error: Some(message),
        }
    }
}

/// Download, validate and parse one uploaded file while keeping its
/// persisted status in step.
pub struct ProcessFileUseCase {
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn Storage>,
    parser: Arc<dyn FileParser>,
}

impl ProcessFileUseCase {
    pub fn new(
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn Storage>,
        parser: Arc<dyn FileParser>,
    ) -> Self {
        Self {
            files,
            storage,
            parser,
        }
    }

    /// Collaborator failures after the file is marked processing come back as
    /// `Ok` with `success == false`, once the failure is persisted. Only a
    /// missing file or an unwritable status are `Err`.
    #[instrument(skip(self, ctx, request), fields(file_id = %request.file_id))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: ProcessFileRequest,
    ) -> Result<ProcessFileResponse, IntakeError> {
        // 1. Load
        let mut file = ctx
            .run("files.file_metadata", self.files.file_metadata(&request.file_id))
            .await
            .inspect_err(|e| error!(error = %e, "File metadata not available"))?;

        let path = if request.file_path.is_empty() {
            file.file_path.clone()
        } else {
            request.file_path.clone()
        };
        info!(path = %path, format = %file.file_format, "Starting file processing");

        // 2. Mark processing
        file.mark_processing()?;
        ctx.run("files.save", self.files.save_file_metadata(&file))
            .await
            .inspect_err(|e| error!(error = %e, "Could not persist processing state"))?;

        if !self.parser.supports(file.file_format) {
            let message = format!("unsupported file format: {}", file.file_format);
            return self.fail(ctx, file, message).await;
        }

        // 3. Download
        let content = match self.download_bytes(ctx, &path).await {
            Ok(content) => content,
            Err(e) => {
                let message = format!("failed to download file: {}", e);
                return self.fail(ctx, file, message).await;
            }
        };

        if !file.verify_checksum(&content) {
            let message = format!(
                "checksum mismatch for {}: expected {}",
                file.file_name, file.checksum
            );
            return self.fail(ctx, file, message).await;
        }

        // 4. Structural validation (consumes the stream)
        let stream: ByteStream = Box::new(std::io::Cursor::new(content));
        if let Err(e) = ctx.run("parser.validate", self.parser.validate(stream)).await {
            let message = format!("file validation failed: {}", e);
            return self.fail(ctx, file, message).await;
        }

        // 5. Fresh stream for the parser
        let stream = match ctx.run("storage.download", self.storage.download(&path)).await {
            Ok(stream) => stream,
            Err(e) => {
                let message = format!("failed to re-download file: {}", e);
                return self.fail(ctx, file, message).await;
            }
        };

        let mut parsed = match ctx.run("parser.parse", self.parser.parse(stream, &file)).await {
            Ok(parsed) => parsed,
            Err(e) => {
                let message = format!("failed to parse file: {}", e);
                return self.fail(ctx, file, message).await;
            }
        };

        // 6. Row-level problems do not fail the file
        if parsed.has_errors() {
            warn!(
                error_count = parsed.error_count(),
                "File parsed with row errors"
            );
            for e in parsed.errors().iter().take(LOGGED_PARSE_ERRORS) {
                warn!(row = e.row, column = %e.column, "{}", e.message);
            }
        }

        // 7. Complete
        let record_count = parsed.record_count();
        file.mark_completed(record_count)?;
        ctx.run("files.save", self.files.save_file_metadata(&file))
            .await
            .inspect_err(|e| error!(error = %e, "Could not persist completed state"))?;

        info!(record_count, "File processing completed");
        parsed.file_metadata = file;

        Ok(ProcessFileResponse {
            file_id: request.file_id,
            parsed_data: Some(parsed),
            record_count,
            success: true,
            error: None,
        })
    }

    /// Download and structural check only. File state is left untouched.
    #[instrument(skip(self, ctx, request), fields(file_id = %request.file_id))]
    pub async fn validate_file(
        &self,
        ctx: &RequestContext,
        request: &ProcessFileRequest,
    ) -> Result<(), IntakeError> {
        let stream = ctx
            .run("storage.download", self.storage.download(&request.file_path))
            .await?;
        ctx.run("parser.validate", self.parser.validate(stream)).await
    }

    /// Run `execute` over up to `limit` pending files, oldest first. A hard
    /// error on one file becomes a failed response for that file only.
    pub async fn process_pending(
        &self,
        ctx: &RequestContext,
        limit: usize,
    ) -> Result<Vec<ProcessFileResponse>, IntakeError> {
        let pending = ctx
            .run("files.pending", self.files.pending_files(limit))
            .await?;

        let mut responses = Vec::with_capacity(pending.len());
        for file in pending {
            let file_id = file.file_id.clone();
            let request = ProcessFileRequest::new(file.file_id, file.file_path);
            match self.execute(ctx, request).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    error!(file_id = %file_id, error = %e, "Pending file could not be processed");
                    responses.push(ProcessFileResponse::failed(&file_id, e.to_string()));
                }
            }
        }
        Ok(responses)
    }

    async fn download_bytes(&self, ctx: &RequestContext, path: &str) -> Result<Vec<u8>, IntakeError> {
        let mut stream = ctx
            .run("storage.download", self.storage.download(path))
            .await?;
        let mut content = Vec::new();
        ctx.run("storage.read", async {
            stream.read_to_end(&mut content).await?;
            Ok(())
        })
        .await?;
        Ok(content)
    }

    /// Record the failure on the file, then report it.
    async fn fail(
        &self,
        ctx: &RequestContext,
        mut file: FileMetadata,
        message: String,
    ) -> Result<ProcessFileResponse, IntakeError> {
        error!(error = %message, "File processing failed");

        if let Err(e) = file.mark_failed(message.clone()) {
            error!(error = %e, "Could not mark file as failed");
        } else if let Err(e) = ctx
            .detached()
            .run("files.save", self.files.save_file_metadata(&file))
            .await
        {
            error!(error = %e, "Could not persist failed state");
        }

        Ok(ProcessFileResponse::failed(&file.file_id, message))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entity::FieldValue;
    use crate::domain::file::{FileFormat, ProcessingStatus, Record};
    use crate::infrastructure::adapters::InMemoryFileRepository;
    use crate::infrastructure::error::InfrastructureError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    // --- MOCKS ---

    #[derive(Default)]
    struct MockStorage {
        blobs: HashMap<String, Vec<u8>>,
        downloads: Mutex<usize>,
    }

    impl MockStorage {
        fn with(path: &str, content: &[u8]) -> Self {
            Self {
                blobs: HashMap::from([(path.to_string(), content.to_vec())]),
                downloads: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Storage for MockStorage {
        async fn upload(&self, _path: &str, _content: &[u8]) -> Result<(), IntakeError> {
            Ok(())
        }
        async fn download(&self, path: &str) -> Result<ByteStream, IntakeError> {
            *self.downloads.lock().unwrap() += 1;
            match self.blobs.get(path) {
                Some(bytes) => Ok(Box::new(std::io::Cursor::new(bytes.clone()))),
                None => Err(InfrastructureError::Storage(format!("bucket unreachable for {}", path)).into()),
            }
        }
        async fn delete(&self, _path: &str) -> Result<(), IntakeError> {
            Ok(())
        }
        async fn exists(&self, path: &str) -> Result<bool, IntakeError> {
            Ok(self.blobs.contains_key(path))
        }
        async fn signed_url(&self, path: &str, _expires_in: Duration) -> Result<String, IntakeError> {
            Ok(format!("mock://{}", path))
        }
    }

    /// Splits lines on commas; the first line is the header.
    #[derive(Default)]
    struct MockParser {
        parse_calls: Mutex<usize>,
        reject: bool,
    }

    #[async_trait]
    impl FileParser for MockParser {
        async fn parse(&self, mut content: ByteStream, file: &FileMetadata) -> Result<ParsedData, IntakeError> {
            *self.parse_calls.lock().unwrap() += 1;
            let mut text = String::new();
            content.read_to_string(&mut text).await?;
            let mut lines = text.lines();
            let headers: Vec<String> = lines
                .next()
                .unwrap_or_default()
                .split(',')
                .map(str::to_string)
                .collect();
            let mut data = ParsedData::new(file.clone(), headers.clone());
            for (i, line) in lines.enumerate() {
                let cells: Vec<&str> = line.split(',').collect();
                if cells.len() != headers.len() {
                    data.add_error(i + 1, "*", "wrong number of cells");
                    continue;
                }
                let record: Record = headers
                    .iter()
                    .zip(cells)
                    .map(|(h, c)| (h.clone(), FieldValue::from(c)))
                    .collect();
                data.add_record(record);
            }
            Ok(data)
        }
        async fn validate(&self, mut content: ByteStream) -> Result<(), IntakeError> {
            let mut sink = Vec::new();
            content.read_to_end(&mut sink).await?;
            if self.reject || sink.is_empty() {
                return Err(IntakeError::InternalError("empty or malformed file".into()));
            }
            Ok(())
        }
        async fn extract_metadata(&self, _content: ByteStream) -> Result<FileMetadata, IntakeError> {
            Ok(FileMetadata::new("x.csv", "x.csv", 1, FileFormat::Csv))
        }
        fn supports(&self, format: FileFormat) -> bool {
            format == FileFormat::Csv
        }
    }

    const CSV: &[u8] = b"account_id,name\nA1,Alice\nA2,Bob\nbroken\n";

    async fn setup(
        storage: MockStorage,
        parser: MockParser,
        file: &FileMetadata,
    ) -> (ProcessFileUseCase, Arc<InMemoryFileRepository>, Arc<MockParser>, Arc<MockStorage>) {
        let files = Arc::new(InMemoryFileRepository::new());
        files.save_file_metadata(file).await.unwrap();
        let parser = Arc::new(parser);
        let storage = Arc::new(storage);
        let use_case = ProcessFileUseCase::new(files.clone(), storage.clone(), parser.clone());
        (use_case, files, parser, storage)
    }

    #[tokio::test]
    async fn test_happy_path_completes_with_row_errors() -> anyhow::Result<()> {
        let file = FileMetadata::for_content("accounts.csv", "up/accounts.csv", FileFormat::Csv, CSV);
        let (use_case, files, _, storage) =
            setup(MockStorage::with("up/accounts.csv", CSV), MockParser::default(), &file).await;

        let response = use_case
            .execute(&RequestContext::new(), ProcessFileRequest::new(&file.file_id, ""))
            .await?;

        assert!(response.success);
        assert_eq!(response.record_count, 2);
        let parsed = response.parsed_data.unwrap();
        assert_eq!(parsed.error_count(), 1);
        assert!(parsed.file_metadata.is_completed());

        let stored = files.file_metadata(&file.file_id).await?;
        assert_eq!(stored.processing_status, ProcessingStatus::Completed);
        assert_eq!(stored.record_count, 2);
        assert!(stored.processed_at.is_some());
        // validation stream + parse stream
        assert_eq!(*storage.downloads.lock().unwrap(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_failure_marks_failed_without_parsing() -> anyhow::Result<()> {
        let file = FileMetadata::new("accounts.csv", "up/accounts.csv", 42, FileFormat::Csv);
        let (use_case, files, parser, _) =
            setup(MockStorage::default(), MockParser::default(), &file).await;

        let response = use_case
            .execute(
                &RequestContext::new(),
                ProcessFileRequest::new(&file.file_id, "up/accounts.csv"),
            )
            .await?;

        assert!(!response.success);
        let stored = files.file_metadata(&file.file_id).await?;
        assert_eq!(stored.processing_status, ProcessingStatus::Failed);
        assert!(stored.error_message.unwrap().contains("bucket unreachable"));
        assert!(response.error.unwrap().contains("bucket unreachable"));
        assert_eq!(*parser.parse_calls.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_failure_marks_failed() -> anyhow::Result<()> {
        let file = FileMetadata::new("accounts.csv", "up/accounts.csv", 42, FileFormat::Csv);
        let parser = MockParser {
            reject: true,
            ..Default::default()
        };
        let (use_case, files, parser, _) =
            setup(MockStorage::with("up/accounts.csv", CSV), parser, &file).await;

        let response = use_case
            .execute(&RequestContext::new(), ProcessFileRequest::new(&file.file_id, ""))
            .await?;

        assert!(!response.success);
        assert!(files.file_metadata(&file.file_id).await?.is_failed());
        assert_eq!(*parser.parse_calls.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_checksum_mismatch_fails_before_parse() -> anyhow::Result<()> {
        let file = FileMetadata::for_content("a.csv", "a.csv", FileFormat::Csv, b"something else");
        let (use_case, files, parser, _) =
            setup(MockStorage::with("a.csv", CSV), MockParser::default(), &file).await;

        let response = use_case
            .execute(&RequestContext::new(), ProcessFileRequest::new(&file.file_id, ""))
            .await?;

        assert!(response.error.unwrap().contains("checksum mismatch"));
        assert!(files.file_metadata(&file.file_id).await?.is_failed());
        assert_eq!(*parser.parse_calls.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_format_fails() -> anyhow::Result<()> {
        let file = FileMetadata::new("a.parquet", "a.parquet", 10, FileFormat::Parquet);
        let (use_case, files, _, _) =
            setup(MockStorage::with("a.parquet", CSV), MockParser::default(), &file).await;

        let response = use_case
            .execute(&RequestContext::new(), ProcessFileRequest::new(&file.file_id, ""))
            .await?;
        assert!(!response.success);
        assert!(files.file_metadata(&file.file_id).await?.is_failed());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_metadata_is_hard_error() {
        let file = FileMetadata::new("a.csv", "a.csv", 10, FileFormat::Csv);
        let (use_case, _, _, _) = setup(MockStorage::default(), MockParser::default(), &file).await;

        let err = use_case
            .execute(&RequestContext::new(), ProcessFileRequest::new("ghost", "a.csv"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    /// Cancels the request from inside the download, then stalls.
    struct CancellingStorage {
        inner: MockStorage,
        ctx: RequestContext,
    }

    #[async_trait]
    impl Storage for CancellingStorage {
        async fn upload(&self, path: &str, content: &[u8]) -> Result<(), IntakeError> {
            self.inner.upload(path, content).await
        }
        async fn download(&self, path: &str) -> Result<ByteStream, IntakeError> {
            self.ctx.cancel();
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.inner.download(path).await
        }
        async fn delete(&self, path: &str) -> Result<(), IntakeError> {
            self.inner.delete(path).await
        }
        async fn exists(&self, path: &str) -> Result<bool, IntakeError> {
            self.inner.exists(path).await
        }
        async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String, IntakeError> {
            self.inner.signed_url(path, expires_in).await
        }
    }

    #[tokio::test]
    async fn test_cancelled_request_is_recorded_as_failure() -> anyhow::Result<()> {
        let file = FileMetadata::new("a.csv", "a.csv", 10, FileFormat::Csv);
        let files = Arc::new(InMemoryFileRepository::new());
        files.save_file_metadata(&file).await?;

        let ctx = RequestContext::new();
        let storage = CancellingStorage {
            inner: MockStorage::with("a.csv", CSV),
            ctx: ctx.clone(),
        };
        let use_case = ProcessFileUseCase::new(
            files.clone(),
            Arc::new(storage),
            Arc::new(MockParser::default()),
        );

        let response = use_case
            .execute(&ctx, ProcessFileRequest::new(&file.file_id, ""))
            .await?;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("cancelled"));
        assert!(files.file_metadata(&file.file_id).await?.is_failed());
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_file_leaves_state_alone() -> anyhow::Result<()> {
        let file = FileMetadata::new("a.csv", "a.csv", 10, FileFormat::Csv);
        let (use_case, files, parser, _) =
            setup(MockStorage::with("a.csv", CSV), MockParser::default(), &file).await;

        use_case
            .validate_file(&RequestContext::new(), &ProcessFileRequest::new(&file.file_id, "a.csv"))
            .await?;
        let stored = files.file_metadata(&file.file_id).await?;
        assert_eq!(stored.processing_status, ProcessingStatus::Pending);
        assert_eq!(*parser.parse_calls.lock().unwrap(), 0);

        assert!(use_case
            .validate_file(&RequestContext::new(), &ProcessFileRequest::new(&file.file_id, "missing.csv"))
            .await
            .is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_process_pending_handles_each_file() -> anyhow::Result<()> {
        let file = FileMetadata::new("a.csv", "a.csv", 10, FileFormat::Csv);
        let (use_case, files, _, _) =
            setup(MockStorage::with("a.csv", CSV), MockParser::default(), &file).await;
        let other = FileMetadata::new("b.csv", "b.csv", 10, FileFormat::Csv);
        files.save_file_metadata(&other).await?;

        let responses = use_case.process_pending(&RequestContext::new(), 10).await?;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses.iter().filter(|r| r.success).count(), 1);
        assert!(files.pending_files(10).await?.is_empty());
        Ok(())
    }

    /// Refuses every write for one file.
    struct StuckFile {
        inner: InMemoryFileRepository,
        stuck_id: String,
    }

    #[async_trait]
    impl FileRepository for StuckFile {
        async fn save_file_metadata(&self, file: &FileMetadata) -> Result<(), IntakeError> {
            if file.file_id == self.stuck_id {
                return Err(InfrastructureError::Repository("row locked".into()).into());
            }
            self.inner.save_file_metadata(file).await
        }
        async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata, IntakeError> {
            self.inner.file_metadata(file_id).await
        }
        async fn update_file_status(
            &self,
            file_id: &str,
            status: ProcessingStatus,
            error_message: Option<&str>,
        ) -> Result<(), IntakeError> {
            self.inner.update_file_status(file_id, status, error_message).await
        }
        async fn pending_files(&self, limit: usize) -> Result<Vec<FileMetadata>, IntakeError> {
            self.inner.pending_files(limit).await
        }
    }

    #[tokio::test]
    async fn test_process_pending_isolates_hard_errors() -> anyhow::Result<()> {
        let stuck = FileMetadata::new("a.csv", "a.csv", 10, FileFormat::Csv);
        let mut healthy = FileMetadata::new("b.csv", "b.csv", 10, FileFormat::Csv);
        healthy.upload_timestamp = stuck.upload_timestamp + chrono::Duration::seconds(1);

        let inner = InMemoryFileRepository::new();
        inner.save_file_metadata(&stuck).await?;
        inner.save_file_metadata(&healthy).await?;
        let files = Arc::new(StuckFile {
            inner,
            stuck_id: stuck.file_id.clone(),
        });

        let storage = MockStorage {
            blobs: HashMap::from([
                ("a.csv".to_string(), CSV.to_vec()),
                ("b.csv".to_string(), CSV.to_vec()),
            ]),
            downloads: Mutex::new(0),
        };
        let use_case = ProcessFileUseCase::new(
            files.clone(),
            Arc::new(storage),
            Arc::new(MockParser::default()),
        );

        let responses = use_case.process_pending(&RequestContext::new(), 10).await?;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].file_id, stuck.file_id);
        assert!(!responses[0].success);
        assert!(responses[0].error.as_deref().unwrap().contains("row locked"));
        assert!(responses[1].success);
        assert!(files.file_metadata(&healthy.file_id).await?.is_completed());
        Ok(())
    }
}
