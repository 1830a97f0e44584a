mod store_impl {
    use std::collections::HashSet;

    use chrono::Utc;
    use tokio::sync::Mutex;
    use tracing::{info, warn};

    use crate::config::Limits;
    use crate::error::ReviewError;
    use crate::models::review::{Review, ReviewRequest, StoredReview};
    use crate::persist::{Persister, Snapshot};
    use crate::utils::{address::normalize_address, sanitize::sanitize_text};


    #[derive(Debug, Default)]
    struct StoreState {
        reviews: Vec<StoredReview>,
        ledger: Vec<String>,
        seen: HashSet<String>,
        last_id: i64,
    }

    impl StoreState {
        fn from_snapshot(snapshot: Snapshot) -> Self {
            let mut state = StoreState::default();
            for address in snapshot.ledger {
                state.record_address(normalize_address(&address));
            }
            for mut stored in snapshot.reviews {
                let address = normalize_address(&stored.submitter_address);
                if !state.seen.contains(&address) {
                    warn!("Review {} had no ledger entry, adding {}", stored.review.id, address);
                    state.record_address(address.clone());
                }
                stored.submitter_address = address;
                state.last_id = state.last_id.max(stored.review.id);
                state.reviews.push(stored);
            }
            state
        }

        fn record_address(&mut self, address: String) {
            if self.seen.insert(address.clone()) {
                self.ledger.push(address);
            }
        }

        fn next_id(&mut self) -> i64 {
            let id = Utc::now().timestamp_millis().max(self.last_id + 1);
            self.last_id = id;
            id
        }

        fn snapshot(&self) -> Snapshot {
            Snapshot {
                reviews: self.reviews.clone(),
                ledger: self.ledger.clone(),
            }
        }
    }

    /// In-memory review collection plus the submission ledger.
    ///
    /// Every accepted submission is mirrored to disk by the [`Persister`].
    #[derive(Debug)]
    pub struct ReviewStore {
        state: Mutex<StoreState>,
        limits: Limits,
        persister: Persister,
    }

    impl ReviewStore {
        pub fn new(snapshot: Snapshot, limits: Limits, persister: Persister) -> Self {
            let state = StoreState::from_snapshot(snapshot);
            info!(
                "Review store ready with {} reviews from {} addresses",
                state.reviews.len(),
                state.ledger.len()
            );
            ReviewStore {
                state: Mutex::new(state),
                limits,
                persister,
            }
        }

        // Newest first
        pub async fn list_reviews(&self) -> Vec<Review> {
            let state = self.state.lock().await;
            let mut reviews: Vec<Review> = state.reviews.iter().map(|s| s.review.clone()).collect();
            reviews.sort_by(|a, b| b.id.cmp(&a.id));
            reviews
        }

        pub async fn average_rating(&self) -> f64 {
            let state = self.state.lock().await;
            if state.reviews.is_empty() {
                return 0.0;
            }
            let sum: f64 = state.reviews.iter().map(|s| s.review.rating).sum();
            sum / state.reviews.len() as f64
        }

        pub async fn snapshot(&self) -> Snapshot {
            self.state.lock().await.snapshot()
        }

        /// Validates, sanitizes and records one review.
        ///
        /// The ledger is checked before the payload, so a repeat submitter gets
        /// `DuplicateSubmission` even for an invalid body. On `PersistenceFailure`
        /// the review has still been accepted in memory.
        pub async fn submit_review(
            &self,
            request: ReviewRequest,
            submitter_address: &str,
        ) -> Result<Review, ReviewError> {
            let address = normalize_address(submitter_address);
            let mut state = self.state.lock().await;

            if state.seen.contains(&address) {
                info!("Rejected repeat submission from {}", address);
                return Err(ReviewError::DuplicateSubmission);
            }

            let rating = self.validate_rating(&request)?;
            let text = self.validate_text(request.text.as_deref())?;
            let name = self.validate_name(request.name.as_deref())?;

            let review = Review {
                id: state.next_id(),
                rating: (rating * 10.0).round() / 10.0,
                text,
                name,
            };
            state.reviews.push(StoredReview {
                review: review.clone(),
                submitter_address: address.clone(),
            });
            state.record_address(address);
            info!("Accepted review {} with rating {}", review.id, review.rating);

            // queued under the lock so the writer sees snapshots in mutation order
            self.persister.enqueue(state.snapshot())?;
            Ok(review)
        }

        fn validate_rating(&self, request: &ReviewRequest) -> Result<f64, ReviewError> {
            let invalid = || ReviewError::InvalidRating {
                min: self.limits.min_rating,
                max: self.limits.max_rating,
            };
            let rating = request
                .rating
                .as_ref()
                .and_then(|r| r.as_number())
                .ok_or_else(invalid)?;

            if rating < self.limits.min_rating || rating > self.limits.max_rating {
                return Err(invalid());
            }
            Ok(rating)
        }

        fn validate_text(&self, text: Option<&str>) -> Result<String, ReviewError> {
            let invalid = || ReviewError::InvalidText {
                max_len: self.limits.max_text_len,
            };
            let trimmed = text.map(str::trim).unwrap_or_default();
            if trimmed.is_empty() || trimmed.chars().count() > self.limits.max_text_len {
                return Err(invalid());
            }

            // the stored form is what the cap applies to
            let clean = sanitize_text(trimmed);
            if clean.is_empty() || clean.chars().count() > self.limits.max_text_len {
                return Err(invalid());
            }
            Ok(clean)
        }

        fn validate_name(&self, name: Option<&str>) -> Result<Option<String>, ReviewError> {
            let Some(trimmed) = name.map(str::trim).filter(|n| !n.is_empty()) else {
                return Ok(None);
            };
            let invalid = || ReviewError::InvalidName {
                max_len: self.limits.max_name_len,
            };
            if trimmed.chars().count() > self.limits.max_name_len {
                return Err(invalid());
            }

            let clean = sanitize_text(trimmed);
            if clean.chars().count() > self.limits.max_name_len {
                return Err(invalid());
            }
            Ok((!clean.is_empty()).then_some(clean))
        }
    }
}

pub use store_impl::ReviewStore;
