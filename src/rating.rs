use crate::models::Resource;
use serde::{Serialize, Serializer};
use std::fmt;

/// Aggregate shown next to a resource. `New` means nobody has rated it yet,
/// which is not the same thing as a zero rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageRating {
    New,
    Rated(f64),
}

impl AverageRating {
    pub fn value(&self) -> Option<f64> {
        match self {
            AverageRating::New => None,
            AverageRating::Rated(v) => Some(*v),
        }
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AverageRating::New => f.write_str("New"),
            AverageRating::Rated(v) => write!(f, "{:.1}", v),
        }
    }
}

impl Serialize for AverageRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AverageRating::New => serializer.serialize_str("New"),
            AverageRating::Rated(v) => serializer.serialize_f64(*v),
        }
    }
}

/// Unrounded mean of the review ratings, 0 when there are none. Sort key for `rating`.
pub fn mean_rating(resource: &Resource) -> f64 {
    if resource.reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = resource.reviews.iter().map(|r| u32::from(r.rating)).sum();
    f64::from(total) / resource.reviews.len() as f64
}

pub fn average_rating(resource: &Resource) -> AverageRating {
    if resource.reviews.is_empty() {
        AverageRating::New
    } else {
        AverageRating::Rated(round_one_decimal(mean_rating(resource)))
    }
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub uploads: usize,
    pub reviews_received: usize,
    /// Mean of the per-resource means, over resources with at least one review.
    pub average_rating: AverageRating,
}

pub fn profile_stats(uploads: &[Resource]) -> ProfileStats {
    let rated: Vec<f64> = uploads
        .iter()
        .filter(|r| !r.reviews.is_empty())
        .map(mean_rating)
        .collect();

    let average_rating = if rated.is_empty() {
        AverageRating::New
    } else {
        AverageRating::Rated(round_one_decimal(rated.iter().sum::<f64>() / rated.len() as f64))
    };

    ProfileStats {
        uploads: uploads.len(),
        reviews_received: uploads.iter().map(|r| r.reviews.len()).sum(),
        average_rating,
    }
}
