use crate::application::use_cases::cleaning_session::{ChatTurn, CleaningSession};
use crate::application::use_cases::interpret::InterpretationGateway;
use crate::application::use_cases::operation_executor::ApplyReport;
use crate::domain::dataset::{CleaningOperation, Row};
use crate::domain::error::AppError;
use actix_cors::Cors;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::http::StatusCode;
use actix_web::{
    dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder, ResponseError,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use validator::Validate;

const MAX_LOG_ENTRIES: usize = 100;
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub session: tokio::sync::Mutex<CleaningSession>,
    pub gateway: Arc<dyn InterpretationGateway>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    pub fn new(gateway: Arc<dyn InterpretationGateway>) -> Self {
        Self {
            session: tokio::sync::Mutex::new(CleaningSession::new()),
            gateway,
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetView {
    pub file_name: Option<String>,
    pub version: u64,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl DatasetView {
    fn from_session(session: &CleaningSession) -> Option<Self> {
        session.dataset().map(|dataset| Self {
            file_name: session.file_name().map(str::to_string),
            version: session.version(),
            columns: dataset.columns().to_vec(),
            rows: dataset.rows().to_vec(),
        })
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoadDatasetRequest {
    #[validate(length(min = 1, message = "fileName must not be empty"))]
    pub file_name: String,
    pub content: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    #[validate(length(min = 1, message = "fileName must not be empty"))]
    pub file_name: String,
}

#[derive(Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub operations: Vec<CleaningOperation>,
    /// Dataset version the operations were proposed against
    #[serde(default)]
    pub dataset_version: Option<u64>,
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub report: ApplyReport,
    pub dataset: Option<DatasetView>,
}

fn dataset_response(session: &CleaningSession) -> Result<HttpResponse, AppError> {
    DatasetView::from_session(session)
        .map(|view| HttpResponse::Ok().json(view))
        .ok_or_else(|| AppError::NotFound("No dataset loaded".to_string()))
}

#[post("/dataset")]
async fn load_dataset(
    data: web::Data<HttpState>,
    req: web::Json<LoadDatasetRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Loading dataset {} ({} bytes)",
            req.file_name,
            req.content.len()
        ),
    );

    let mut session = data.session.lock().await;
    session.load_csv(&req.file_name, &req.content);
    dataset_response(&session)
}

#[post("/dataset/upload")]
async fn upload_dataset(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Uploading dataset {} ({} bytes)", query.file_name, body.len()),
    );

    let mut session = data.session.lock().await;
    session.load_bytes(&query.file_name, &body);
    dataset_response(&session)
}

#[get("/dataset")]
async fn get_dataset(data: web::Data<HttpState>) -> Result<HttpResponse, AppError> {
    let session = data.session.lock().await;
    dataset_response(&session)
}

#[get("/stats")]
async fn get_stats(data: web::Data<HttpState>) -> impl Responder {
    let session = data.session.lock().await;
    HttpResponse::Ok().json(session.column_stats())
}

#[post("/chat")]
async fn chat(
    data: web::Data<HttpState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::ValidationError(
            "message must not be blank".to_string(),
        ));
    }

    add_log(&data.logs, "INFO", "HttpApi", "Interpreting cleaning request");

    // The session stays unlocked while the gateway runs
    let turn = data.session.lock().await.begin_message(message);
    let reply = match turn {
        ChatTurn::Answered(reply) => reply,
        ChatTurn::Interpret(pending) => {
            let outcome = data.gateway.interpret(message, &pending.stats).await;
            data.session.lock().await.finish_message(pending, outcome)
        }
    };

    let count = reply.operations.as_ref().map(Vec::len);
    match count {
        Some(count) => add_log(
            &data.logs,
            "INFO",
            "HttpApi",
            &format!("Proposed {} operation(s)", count),
        ),
        None => add_log(&data.logs, "WARN", "HttpApi", &reply.content),
    }

    Ok(HttpResponse::Ok().json(reply))
}

#[post("/apply")]
async fn apply(
    data: web::Data<HttpState>,
    req: web::Json<ApplyRequest>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let mut session = data.session.lock().await;

    let report = session
        .apply_operations(&req.operations, req.dataset_version)
        .inspect_err(|e| {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Apply failed: {}", e),
            )
        })?;

    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Applied {} of {} operation(s)",
            report.applied_count(),
            report.operations.len()
        ),
    );

    Ok(HttpResponse::Ok().json(ApplyResponse {
        report,
        dataset: DatasetView::from_session(&session),
    }))
}

#[get("/messages")]
async fn get_messages(data: web::Data<HttpState>) -> impl Responder {
    let session = data.session.lock().await;
    HttpResponse::Ok().json(session.messages())
}

#[get("/export")]
async fn export(data: web::Data<HttpState>) -> Result<HttpResponse, AppError> {
    let session = data.session.lock().await;
    let csv = session.export_csv()?;
    let file_name = session.export_file_name();

    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Exporting {}", file_name),
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(csv))
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = lock_logs(&data.logs);
    HttpResponse::Ok().json(&*logs)
}

fn lock_logs(logs: &Mutex<Vec<LogEntry>>) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
    logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = lock_logs(logs);
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Register the `/api` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .app_data(web::JsonConfig::default().limit(MAX_UPLOAD_BYTES))
            .service(load_dataset)
            .service(upload_dataset)
            .service(get_dataset)
            .service(get_stats)
            .service(chat)
            .service(apply)
            .service(get_messages)
            .service(export)
            .service(get_logs),
    );
}

pub fn start_server(state: web::Data<HttpState>, host: &str, port: u16) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    tracing::info!(host, port, "HTTP API listening");
    Ok(server)
}
