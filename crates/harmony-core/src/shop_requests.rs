//! Shop-opening request lifecycle.
//!
//! ```text
//! pending ──approve──▶ approved
//!    └────reject────▶ rejected
//! ```
//!
//! Both reviewed states are terminal.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provinces::find_province;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl ShopRequestStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ShopRequestStatus::Pending => "pending",
            ShopRequestStatus::Approved => "approved",
            ShopRequestStatus::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, ShopRequestStatus::Pending)
    }

    /// Applies a review decision.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RequestAlreadyReviewed`] unless the request is pending.
    pub fn review(self, decision: ReviewDecision) -> Result<Self, CoreError> {
        if self.is_terminal() {
            return Err(CoreError::RequestAlreadyReviewed { current: self });
        }
        Ok(decision.target_status())
    }
}

impl std::fmt::Display for ShopRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShopRequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ShopRequestStatus::Pending),
            "approved" => Ok(ShopRequestStatus::Approved),
            "rejected" => Ok(ShopRequestStatus::Rejected),
            other => Err(CoreError::InvalidEnumValue {
                kind: "shop request status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    #[must_use]
    pub fn target_status(self) -> ShopRequestStatus {
        match self {
            ReviewDecision::Approve => ShopRequestStatus::Approved,
            ReviewDecision::Reject => ShopRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ShopRequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ShopRequest {
    /// Coordinates for the shop created on approval: the submitted point if
    /// complete, otherwise the province centroid when the province is known.
    #[must_use]
    pub fn shop_coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => self
                .province
                .as_deref()
                .and_then(find_province)
                .map(|p| (p.latitude, p.longitude)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(province: Option<&str>, lat: Option<f64>, lon: Option<f64>) -> ShopRequest {
        ShopRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            shop_name: "Warung Bu Siti".to_string(),
            description: None,
            address: Some("Jl. Sudirman 1".to_string()),
            phone: None,
            province: province.map(str::to_string),
            latitude: lat,
            longitude: lon,
            status: ShopRequestStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_request_can_be_approved_or_rejected() {
        assert_eq!(
            ShopRequestStatus::Pending
                .review(ReviewDecision::Approve)
                .unwrap(),
            ShopRequestStatus::Approved
        );
        assert_eq!(
            ShopRequestStatus::Pending
                .review(ReviewDecision::Reject)
                .unwrap(),
            ShopRequestStatus::Rejected
        );
    }

    #[test]
    fn reviewed_requests_are_terminal() {
        for current in [ShopRequestStatus::Approved, ShopRequestStatus::Rejected] {
            for decision in [ReviewDecision::Approve, ReviewDecision::Reject] {
                let err = current.review(decision).unwrap_err();
                assert!(matches!(
                    err,
                    CoreError::RequestAlreadyReviewed { current: c } if c == current
                ));
            }
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ShopRequestStatus::Pending,
            ShopRequestStatus::Approved,
            ShopRequestStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ShopRequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn coordinates_prefer_submitted_point() {
        let req = request(Some("jakarta"), Some(-6.3), Some(106.9));
        assert_eq!(req.shop_coordinates(), Some((-6.3, 106.9)));
    }

    #[test]
    fn coordinates_fall_back_to_province_centroid() {
        let req = request(Some("bali"), Some(-8.0), None);
        let (lat, lon) = req.shop_coordinates().expect("bali centroid");
        assert!((lat - -8.6705).abs() < 1e-6);
        assert!((lon - 115.2126).abs() < 1e-6);
    }

    #[test]
    fn coordinates_absent_for_unknown_province() {
        assert_eq!(request(Some("atlantis"), None, None).shop_coordinates(), None);
        assert_eq!(request(None, None, None).shop_coordinates(), None);
    }
}
