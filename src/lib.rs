//! Review submission service.
//!
//! Accepts one rating-plus-text review per client address, keeps the
//! collection in memory, mirrors it to `reviews.json` / `ips.json`, and
//! reports the average rating.
//!
//! | Method | Path | Result |
//! |---|---|---|
//! | GET | `/reviews` | all reviews, newest first |
//! | GET | `/average-rating` | `{ "average": n }` |
//! | POST | `/reviews` | `201` created review, `400` invalid, `403` repeat submitter, `500` persistence failure |
//! | GET | anything else | static assets, falling back to `index.html` |
//!
//! Configuration comes from `PORT`, `DATA_DIR`, `STATIC_DIR` and `RUST_LOG`.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod persist;
pub mod utils;
