//! REST API for simdex.
//!
//! A stateless HTTP server with JSON endpoints for index operations. Each
//! request includes an `index` field naming the index file path; the server
//! loads the index from disk per request and saves it back after mutations.
//!
//! ## Endpoints
//!
//! - `POST /insert` - Append embeddings (creates the index file if missing)
//! - `POST /train`  - Train the coarse quantizer of a clustered index
//! - `POST /search` - Batched top-k similarity search
//! - `POST /report` - Batch similarity report (query id -> matched ids)
//! - `POST /stats`  - Index metadata
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{App, HttpServer};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| App::new().configure(simdex::server::config))
//!         .bind("0.0.0.0:7878")?
//!         .run()
//!         .await
//! }
//! ```

use crate::query::{Index, IndexKind, QueryService, SearchOptions};
use crate::vector::Metric;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Serializes every load-modify-save cycle across workers. Without it two
/// concurrent mutations of the same index file would each load, append,
/// and save, silently losing one of the writes. Reads never take it.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

fn write_guard() -> MutexGuard<'static, ()> {
    WRITE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// --- Request structs ---

#[derive(Deserialize)]
struct VectorEntry {
    id: String,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct Query {
    values: Vec<f32>,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    num_probe: Option<usize>,
}

#[derive(Deserialize)]
struct InsertRequest {
    index: String,
    /// Index kind used only when the file does not exist yet.
    #[serde(default)]
    kind: IndexKind,
    /// Metric used only when the file does not exist yet.
    #[serde(default)]
    metric: Metric,
    vectors: Vec<VectorEntry>,
}

#[derive(Deserialize)]
struct TrainRequest {
    index: String,
    num_clusters: usize,
}

#[derive(Deserialize)]
struct SearchRequest {
    index: String,
    queries: Vec<Query>,
}

#[derive(Deserialize)]
struct ReportQuery {
    id: String,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct ReportRequest {
    index: String,
    queries: Vec<ReportQuery>,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    num_probe: Option<usize>,
}

#[derive(Deserialize)]
struct StatsRequest {
    index: String,
}

// --- Response structs ---

#[derive(Serialize)]
struct InsertResponse {
    inserted: usize,
    results: Vec<InsertResult>,
}

#[derive(Serialize)]
struct InsertResult {
    id: String,
    status: String,
    message: String,
}

#[derive(Serialize)]
struct TrainResponse {
    num_clusters: usize,
    assigned: usize,
    message: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResultGroup>,
}

#[derive(Serialize)]
struct SearchResultGroup {
    matches: Vec<MatchResult>,
    message: String,
}

#[derive(Serialize)]
struct MatchResult {
    id: String,
    distance: f32,
}

#[derive(Serialize)]
struct ReportResponse {
    report: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct StatsResponse {
    count: usize,
    dimension: Option<usize>,
    kind: IndexKind,
    metric: Metric,
    trained: bool,
}

/// Loads the index at `path`, or creates an empty one of the requested
/// shape when the file does not exist yet.
fn load_or_create(path: &str, kind: IndexKind, metric: Metric) -> Result<Index, String> {
    if Path::new(path).exists() {
        return Index::load(path).map_err(|e| e.to_string());
    }

    Ok(Index::new(kind, metric))
}

fn load_existing(path: &str) -> Result<Index, String> {
    Index::load(path).map_err(|e| e.to_string())
}

// --- Handlers ---

async fn insert_handler(body: web::Json<InsertRequest>) -> impl Responder {
    let _guard = write_guard();

    let mut index = match load_or_create(&body.index, body.kind, body.metric) {
        Ok(index) => index,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e})),
    };

    let mut results = Vec::new();
    let mut inserted = 0;

    for entry in &body.vectors {
        match index.append(entry.id.clone(), entry.values.clone()) {
            Ok(()) => {
                inserted += 1;
                results.push(InsertResult {
                    id: entry.id.clone(),
                    status: "ok".to_string(),
                    message: "appended".to_string(),
                });
            }
            Err(e) => {
                results.push(InsertResult {
                    id: entry.id.clone(),
                    status: "error".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    // A trained clustered index assigns new vectors against its existing
    // (possibly stale) centroids; it is never retrained implicitly.
    if let Index::Clustered(clustered) = &mut index {
        if clustered.is_trained() {
            if let Err(e) = clustered.add() {
                return HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": e.to_string()}));
            }
        }
    }

    if let Err(e) = index.save(&body.index) {
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": e.to_string()}));
    }

    HttpResponse::Ok().json(InsertResponse { inserted, results })
}

async fn train_handler(body: web::Json<TrainRequest>) -> impl Responder {
    let _guard = write_guard();

    let mut index = match load_existing(&body.index) {
        Ok(index) => index,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e})),
    };

    let clustered = match &mut index {
        Index::Clustered(clustered) => clustered,
        Index::Flat(_) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "flat index does not need training"}));
        }
    };

    if let Err(e) = clustered.train(body.num_clusters).and_then(|()| clustered.add()) {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}));
    }
    let assigned = clustered.len();

    if let Err(e) = index.save(&body.index) {
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": e.to_string()}));
    }

    HttpResponse::Ok().json(TrainResponse {
        num_clusters: body.num_clusters,
        assigned,
        message: "Training complete".to_string(),
    })
}

async fn search_handler(body: web::Json<SearchRequest>) -> impl Responder {
    let index = match load_existing(&body.index) {
        Ok(index) => index,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e})),
    };

    let mut results = Vec::new();

    for entry in &body.queries {
        let mut options = SearchOptions::default();
        if let Some(k) = entry.k {
            options.k = k;
        }
        if let Some(num_probe) = entry.num_probe {
            options.num_probe = num_probe;
        }

        match index.search(&entry.values, &options) {
            Ok(matches) => {
                results.push(SearchResultGroup {
                    matches: matches
                        .into_iter()
                        .map(|n| MatchResult {
                            id: n.identifier,
                            distance: n.distance,
                        })
                        .collect(),
                    message: "Search Success".to_string(),
                });
            }
            Err(e) => {
                results.push(SearchResultGroup {
                    matches: Vec::new(),
                    message: e.to_string(),
                });
            }
        }
    }

    HttpResponse::Ok().json(SearchResponse { results })
}

async fn report_handler(body: web::Json<ReportRequest>) -> impl Responder {
    let index = match load_existing(&body.index) {
        Ok(index) => index,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e})),
    };

    let mut options = SearchOptions::default();
    if let Some(k) = body.k {
        options.k = k;
    }
    if let Some(num_probe) = body.num_probe {
        options.num_probe = num_probe;
    }

    let queries: Vec<(String, Vec<f32>)> = body
        .queries
        .iter()
        .map(|q| (q.id.clone(), q.values.clone()))
        .collect();

    let service = QueryService::new(&index);
    match service.similarity_report(&queries, &options) {
        Ok(report) => HttpResponse::Ok().json(ReportResponse { report }),
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    }
}

async fn stats_handler(body: web::Json<StatsRequest>) -> impl Responder {
    let index = match load_existing(&body.index) {
        Ok(index) => index,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e})),
    };

    HttpResponse::Ok().json(StatsResponse {
        count: index.len(),
        dimension: index.dimension(),
        kind: index.kind(),
        metric: index.metric(),
        trained: index.is_trained(),
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/insert").route(web::post().to(insert_handler)))
        .service(web::resource("/train").route(web::post().to(train_handler)))
        .service(web::resource("/search").route(web::post().to(search_handler)))
        .service(web::resource("/report").route(web::post().to(report_handler)))
        .service(web::resource("/stats").route(web::post().to(stats_handler)));
}
