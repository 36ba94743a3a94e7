//! HTTP implementation of the generation service client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    DriveConfig, DriveImportRequest, DriveImportResponse, GenerationService, ServiceError,
    Submission,
};
use crate::config::ServiceConfig;
use crate::models::{JobStatusReport, JobTicket};
use crate::utils::HttpClient;

const GENERATE_PATH: &str = "api/pdf/generate";
const STATUS_PATH: &str = "api/pdf/status";
const DOWNLOAD_PATH: &str = "api/pdf/download";
const DRIVE_CONFIG_PATH: &str = "api/drive/config";
const DRIVE_IMPORT_PATH: &str = "api/drive/import";

/// Generation service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: HttpClient,
    base_url: Url,
    base_str: String,
}

impl HttpGenerationService {
    /// Build a client from the service configuration
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = HttpClient::from_config(config)?;
        Self::with_client(client, &config.base_url)
    }

    /// Use an existing HTTP client against `base_url`
    pub fn with_client(client: HttpClient, base_url: &str) -> Result<Self, ServiceError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        // trailing slash keeps any path prefix when joining
        let base_url = Url::parse(&format!("{}/", trimmed))?;

        Ok(Self {
            client,
            base_url,
            base_str: trimmed.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base_url.join(path)?)
    }

    fn job_endpoint(&self, prefix: &str, job_id: &str) -> Result<Url, ServiceError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(ServiceError::InvalidRequest("empty job id".to_string()));
        }
        self.endpoint(&format!("{}/{}", prefix, urlencoding::encode(job_id)))
    }

    fn build_form(submission: Submission) -> Result<Form, ServiceError> {
        let config = serde_json::to_string(&submission.config)?;
        let exhibits = serde_json::to_string(&submission.exhibits)?;

        let mut form = Form::new().text("config", config).text("exhibits", exhibits);

        for file in submission.files {
            let part = Part::bytes(file.bytes)
                .file_name(file.filename.clone())
                .mime_str(&file.content_type)
                .map_err(|e| {
                    ServiceError::InvalidRequest(format!(
                        "Bad content type for {}: {}",
                        file.filename, e
                    ))
                })?;
            form = form.part("files", part);
        }

        Ok(form)
    }
}

/// Map a response to `T`, turning non-success statuses into [`ServiceError::Http`]
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &Url,
) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Http {
            status: status.as_u16(),
            endpoint: endpoint.path().to_string(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        ServiceError::Parse(format!("Failed to parse {} response: {}", endpoint.path(), e))
    })
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    fn base_url(&self) -> &str {
        &self.base_str
    }

    async fn generate(&self, submission: Submission) -> Result<JobTicket, ServiceError> {
        let url = self.endpoint(GENERATE_PATH)?;
        tracing::debug!(
            "Submitting {} exhibits ({} file parts) to {}",
            submission.exhibits.len(),
            submission.files.len(),
            url
        );

        let form = Self::build_form(submission)?;
        let response = self.client.post(url.as_str()).multipart(form).send().await?;
        let ticket: JobTicket = decode(response, &url).await?;

        if ticket.job_id.trim().is_empty() {
            return Err(ServiceError::Parse(
                "generate response carried an empty jobId".to_string(),
            ));
        }

        Ok(ticket)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatusReport, ServiceError> {
        let url = self.job_endpoint(STATUS_PATH, job_id)?;
        let response = self.client.get(url.as_str()).send().await?;
        decode(response, &url).await
    }

    async fn download(&self, job_id: &str) -> Result<Vec<u8>, ServiceError> {
        let url = self.job_endpoint(DOWNLOAD_PATH, job_id)?;
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Http {
                status: status.as_u16(),
                endpoint: url.path().to_string(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn drive_config(&self) -> Result<DriveConfig, ServiceError> {
        let url = self.endpoint(DRIVE_CONFIG_PATH)?;
        let response = self.client.get(url.as_str()).send().await?;
        decode(response, &url).await
    }

    async fn drive_import(
        &self,
        request: &DriveImportRequest,
    ) -> Result<DriveImportResponse, ServiceError> {
        let url = self.endpoint(DRIVE_IMPORT_PATH)?;
        tracing::debug!("Importing {} remote files via {}", request.files.len(), url);
        let response = self.client.post(url.as_str()).json(request).send().await?;
        decode(response, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExhibitKind, RemoteFileDescriptor, RemoteJobStatus};
    use crate::service::{ExhibitManifestEntry, FilePart, SubmissionConfig};
    use mockito::Matcher;

    fn service_for(server: &mockito::ServerGuard) -> HttpGenerationService {
        let config = ServiceConfig {
            base_url: server.url(),
            api_token: Some("test-token".to_string()),
            ..ServiceConfig::default()
        };
        HttpGenerationService::new(&config).unwrap()
    }

    fn submission() -> Submission {
        Submission {
            config: SubmissionConfig {
                package_id: "pkg-1".to_string(),
                name: "O-1A exhibits".to_string(),
                numbering_style: "letters".to_string(),
                delivery_method: "download".to_string(),
                recipient_email: None,
                visa_type: Some("O-1A".to_string()),
                beneficiary_name: None,
                case_id: None,
            },
            exhibits: vec![ExhibitManifestEntry {
                order: 0,
                number: "A".to_string(),
                label: "Curriculum vitae".to_string(),
                kind: ExhibitKind::Pdf,
                filename: Some("cv.pdf".to_string()),
                url: None,
                imported_from_drive: false,
            }],
            files: vec![FilePart {
                filename: "cv.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.7".to_vec(),
            }],
        }
    }

    #[tokio::test]
    async fn test_generate_posts_multipart_and_returns_job_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/pdf/generate")
            .match_header("authorization", "Bearer test-token")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="config""#.to_string()),
                Matcher::Regex(r#"name="exhibits""#.to_string()),
                Matcher::Regex(r#"filename="cv.pdf""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jobId":"job-42"}"#)
            .create_async()
            .await;

        let service = service_for(&server);
        let ticket = service.generate(submission()).await.unwrap();

        assert_eq!(ticket.job_id, "job-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_surfaces_http_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/pdf/generate")
            .with_status(500)
            .with_body("renderer offline")
            .create_async()
            .await;

        let service = service_for(&server);
        let err = service.generate(submission()).await.unwrap_err();

        match err {
            ServiceError::Http { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "renderer offline");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_decodes_report() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/pdf/status/job-42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "status": "processing",
                    "progress": 55,
                    "statusMessage": "Stamping exhibit C",
                    "logs": ["Merged A", "Merged B"]
                }"#,
            )
            .create_async()
            .await;

        let service = service_for(&server);
        let report = service.status("job-42").await.unwrap();

        assert_eq!(report.status, RemoteJobStatus::Processing);
        assert_eq!(report.progress, Some(55.0));
        assert_eq!(report.status_message.as_deref(), Some("Stamping exhibit C"));
        assert_eq!(report.logs.len(), 2);
    }

    #[tokio::test]
    async fn test_status_rejects_empty_job_id() {
        let server = mockito::Server::new_async().await;
        let service = service_for(&server);
        assert!(matches!(
            service.status("  ").await,
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_status_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/pdf/status/job-1")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let service = service_for(&server);
        assert!(matches!(
            service.status("job-1").await,
            Err(ServiceError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_download_returns_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/pdf/download/job-42")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.7 combined".to_vec())
            .create_async()
            .await;

        let service = service_for(&server);
        let bytes = service.download("job-42").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7 combined".to_vec());
    }

    #[tokio::test]
    async fn test_drive_import_sends_token_and_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/drive/import")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "accessToken": "ya29.token",
                "files": [{"id": "f1", "name": "award.pdf", "mimeType": "application/pdf"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"files":[{"name":"award.pdf","success":true,"size":2048,"type":"pdf","localFilename":"drive_f1_award.pdf"}]}"#,
            )
            .create_async()
            .await;

        let service = service_for(&server);
        let response = service
            .drive_import(&DriveImportRequest {
                access_token: "ya29.token".to_string(),
                files: vec![RemoteFileDescriptor::new("f1", "award.pdf", "application/pdf")],
            })
            .await
            .unwrap();

        assert_eq!(response.files.len(), 1);
        assert_eq!(
            response.files[0].local_filename.as_deref(),
            Some("drive_f1_award.pdf")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_is_kept() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/tenant/api/drive/config")
            .with_status(200)
            .with_body(r#"{"available":true,"clientId":"cid","scope":"drive.readonly"}"#)
            .create_async()
            .await;

        let config = ServiceConfig {
            base_url: format!("{}/tenant/", server.url()),
            ..ServiceConfig::default()
        };
        let service = HttpGenerationService::new(&config).unwrap();
        let drive = service.drive_config().await.unwrap();

        assert!(drive.available);
        assert_eq!(drive.client_id.as_deref(), Some("cid"));
        assert_eq!(service.base_url(), format!("{}/tenant", server.url()));
    }
}
