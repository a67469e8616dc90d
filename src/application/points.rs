use std::sync::Arc;

use storyloft_api_types::{LeaderboardEntry, PointsBreakdown, ReferralInfo, UserStats};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::repos::{PointsRepo, UsersRepo};
use crate::domain::points::{POINTS_PER_REFERRAL, breakdown, compute_points};

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Read-side of the points and referral ledger. Totals are derived from
/// counts on every call.
#[derive(Clone)]
pub struct PointsService {
    points: Arc<dyn PointsRepo>,
    users: Arc<dyn UsersRepo>,
    public_base_url: String,
}

impl PointsService {
    pub fn new(
        points: Arc<dyn PointsRepo>,
        users: Arc<dyn UsersRepo>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            points,
            users,
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<UserStats, ServiceError> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let counts = self.points.profile_counts(user_id).await?;

        Ok(UserStats {
            user_id,
            anonymous_name: user.anonymous_name,
            points: compute_points(&counts.points_profile()),
            stories_count: counts.published.stories,
            videos_count: counts.published.videos,
            shots_count: counts.published.shots,
            referral_count: counts.referral_count,
            total_likes_received: counts.total_likes_received,
        })
    }

    pub async fn breakdown(&self, user_id: Uuid) -> Result<PointsBreakdown, ServiceError> {
        let counts = self.points.profile_counts(user_id).await?;
        Ok(breakdown(&counts.points_profile()))
    }

    pub async fn referral_info(&self, user_id: Uuid) -> Result<ReferralInfo, ServiceError> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;

        Ok(ReferralInfo {
            referral_link: format!(
                "{}/register?ref={}",
                self.public_base_url.trim_end_matches('/'),
                user.referral_code
            ),
            referral_code: user.referral_code,
            referral_count: user.referral_count,
            points_from_referrals: user.referral_count * POINTS_PER_REFERRAL,
        })
    }

    /// Highest totals first; ties go to the alphabetically first username.
    pub async fn leaderboard(&self, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT) as usize;

        let mut ranked: Vec<_> = self
            .points
            .all_profile_counts()
            .await?
            .into_iter()
            .map(|(user, counts)| (compute_points(&counts.points_profile()), user))
            .collect();
        ranked.sort_by(|(a_points, a), (b_points, b)| {
            b_points
                .cmp(a_points)
                .then_with(|| a.username.cmp(&b.username))
        });

        Ok(ranked
            .into_iter()
            .take(limit)
            .zip(1u32..)
            .map(|((points, user), rank)| LeaderboardEntry {
                rank,
                user_id: user.id,
                anonymous_name: user.anonymous_name,
                points,
            })
            .collect())
    }
}
