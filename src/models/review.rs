// src/models/review.rs
use serde::{Deserialize, Serialize};

/// Review as returned to HTTP clients. The submitter address is never part of it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Review {
    pub id: i64,      // Timestamp-derived id, strictly increasing
    pub rating: f64,  // Rounded to one decimal
    pub text: String, // Sanitized plain text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // Optional display label
}

/// Review as written to `reviews.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredReview {
    #[serde(flatten)]
    pub review: Review,
    pub submitter_address: String,
}

/// Rating as sent by clients: a JSON number, a string holding one, or anything else
/// (which later fails validation instead of failing body parsing).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RatingInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RatingInput {
    /// Coerces the input to a finite number.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RatingInput::Number(n) => *n,
            RatingInput::Text(s) => s.trim().parse::<f64>().ok()?,
            RatingInput::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// Body of `POST /reviews`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReviewRequest {
    #[serde(default)]
    pub rating: Option<RatingInput>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AverageRating {
    pub average: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_input_accepts_numbers_and_numeric_strings() {
        let number: RatingInput = serde_json::from_str("4.5").unwrap();
        let text: RatingInput = serde_json::from_str("\" 3 \"").unwrap();
        assert_eq!(number.as_number(), Some(4.5));
        assert_eq!(text.as_number(), Some(3.0));
    }

    #[test]
    fn rating_input_rejects_non_numeric_and_non_finite() {
        assert_eq!(RatingInput::Text("five".into()).as_number(), None);
        assert_eq!(RatingInput::Text("NaN".into()).as_number(), None);
        assert_eq!(RatingInput::Text("inf".into()).as_number(), None);

        let boolean: RatingInput = serde_json::from_str("true").unwrap();
        assert_eq!(boolean.as_number(), None);
    }

    #[test]
    fn stored_review_keeps_address_out_of_public_payload() {
        let stored = StoredReview {
            review: Review {
                id: 7,
                rating: 4.0,
                text: "Nice".into(),
                name: None,
            },
            submitter_address: "203.0.113.5".into(),
        };

        let on_disk = serde_json::to_value(&stored).unwrap();
        assert_eq!(on_disk["submitterAddress"], "203.0.113.5");
        assert_eq!(on_disk["id"], 7);

        let public = serde_json::to_value(&stored.review).unwrap();
        assert!(public.get("submitterAddress").is_none());
        assert!(public.get("name").is_none());
    }

    #[test]
    fn review_request_tolerates_missing_fields() {
        let request: ReviewRequest = serde_json::from_str("{}").unwrap();
        assert!(request.rating.is_none());
        assert!(request.text.is_none());
        assert!(request.name.is_none());
    }
}
