use std::path::PathBuf;
use std::sync::Arc;

use actix_files::{Files, NamedFile};
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{error, info};

use crate::config::INDEX_FILE;
use crate::db::ReviewStore;
use crate::error::ReviewError;
use crate::models::review::{AverageRating, ReviewRequest};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub type StoreData = web::Data<Arc<ReviewStore>>;

pub async fn get_reviews(store: StoreData) -> HttpResponse {
    let reviews = store.list_reviews().await;
    info!("[API] Returning {} reviews", reviews.len());
    HttpResponse::Ok().json(reviews)
}

pub async fn get_average_rating(store: StoreData) -> HttpResponse {
    let average = store.average_rating().await;
    HttpResponse::Ok().json(AverageRating { average })
}

pub async fn create_review(
    store: StoreData,
    req: HttpRequest,
    request: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ReviewError> {
    let address = client_address(&req);
    info!("[API] Received review from {}", address);

    match store.submit_review(request.into_inner(), &address).await {
        Ok(review) => Ok(HttpResponse::Created().json(review)),
        Err(err @ ReviewError::PersistenceFailure(_)) => {
            error!("[API] Review accepted in memory but not persisted: {}", err);
            Err(err)
        }
        Err(err) => {
            info!("[API] Rejected review from {}: {}", address, err);
            Err(err)
        }
    }
}

/// Forwarded / X-Forwarded-For first hop, falling back to the peer address.
pub fn client_address(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or_default()
        .to_string()
}

/// JSON extractor settings: body limit and `{ "error" }` responses for bad bodies.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(|err, _req| ReviewError::MalformedPayload(err.to_string()).into())
}

/// Registers the review routes, then static assets with `index` as the fallback page.
pub fn configure(static_dir: PathBuf, index: PathBuf) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(json_config())
            .route("/reviews", web::get().to(get_reviews))
            .route("/reviews", web::post().to(create_review))
            .route("/average-rating", web::get().to(get_average_rating))
            .service(
                Files::new("/", static_dir)
                    .index_file(INDEX_FILE)
                    .default_handler(fn_service(move |req: ServiceRequest| {
                        let index = index.clone();
                        async move {
                            let (req, _) = req.into_parts();
                            let file = NamedFile::open_async(index).await?;
                            let res = file.into_response(&req);
                            Ok(ServiceResponse::new(req, res))
                        }
                    })),
            );
    }
}
