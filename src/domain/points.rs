//! Points formula. Points are derived on every read and never stored.

use storyloft_api_types::PointsBreakdown;

pub const POINTS_PER_REFERRAL: i64 = 10;
pub const POINTS_PER_PUBLISHED_ITEM: i64 = 1;
pub const LIKES_PER_POINT: i64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsProfile {
    pub referral_count: i64,
    pub published_content_count: i64,
    pub total_likes_received: i64,
}

pub fn compute_points(profile: &PointsProfile) -> i64 {
    breakdown(profile).total_points
}

pub fn breakdown(profile: &PointsProfile) -> PointsBreakdown {
    let referral_points = profile.referral_count.max(0) * POINTS_PER_REFERRAL;
    let content_points = profile.published_content_count.max(0) * POINTS_PER_PUBLISHED_ITEM;
    let likes = profile.total_likes_received.max(0);
    let like_points = likes / LIKES_PER_POINT;

    PointsBreakdown {
        referral_points,
        content_points,
        like_points,
        total_points: referral_points + content_points + like_points,
        likes_until_next_point: LIKES_PER_POINT - likes % LIKES_PER_POINT,
    }
}

/// Number of like milestones newly reached when an author's total moves
/// from `before` to `after`. Never negative.
pub fn milestones_crossed(before: i64, after: i64) -> i64 {
    let before = before.max(0) / LIKES_PER_POINT;
    let after = after.max(0) / LIKES_PER_POINT;
    (after - before).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_profile_totals_thirty_seven() {
        let profile = PointsProfile {
            referral_count: 3,
            published_content_count: 5,
            total_likes_received: 2500,
        };
        assert_eq!(compute_points(&profile), 37);

        let parts = breakdown(&profile);
        assert_eq!(parts.referral_points, 30);
        assert_eq!(parts.content_points, 5);
        assert_eq!(parts.like_points, 2);
        assert_eq!(parts.likes_until_next_point, 500);
    }

    #[test]
    fn milestone_reported_only_on_crossing() {
        assert_eq!(milestones_crossed(998, 999), 0);
        assert_eq!(milestones_crossed(999, 1000), 1);
        assert_eq!(milestones_crossed(1000, 999), 0);
        assert_eq!(milestones_crossed(1999, 2000), 1);
    }
}
