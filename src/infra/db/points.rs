use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{PointsRepo, ProfileCounts, PublishedCounts, RepoError};
use crate::domain::entities::UserRecord;

use super::users::{USER_COLUMNS, UserRow};
use super::{PostgresRepositories, map_sqlx_error};

/// Published counts and likes received, computed per user row `u`.
const PROFILE_COLUMNS: &str = "\
    (SELECT COUNT(*) FROM content c WHERE c.author_id = u.id AND c.kind = 'story' AND c.published_at IS NOT NULL) AS stories, \
    (SELECT COUNT(*) FROM content c WHERE c.author_id = u.id AND c.kind = 'video' AND c.published_at IS NOT NULL) AS videos, \
    (SELECT COUNT(*) FROM content c WHERE c.author_id = u.id AND c.kind = 'shot' AND c.published_at IS NOT NULL) AS shots, \
    (COALESCE((SELECT SUM(c.likes_count) FROM content c WHERE c.author_id = u.id), 0) \
     + COALESCE((SELECT SUM(m.likes_count) FROM comments m WHERE m.user_id = u.id), 0))::BIGINT AS likes_received";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    #[sqlx(flatten)]
    user: UserRow,
    stories: i64,
    videos: i64,
    shots: i64,
    likes_received: i64,
}

impl ProfileRow {
    fn into_parts(self) -> (UserRecord, ProfileCounts) {
        let counts = ProfileCounts {
            referral_count: self.user.referral_count,
            published: PublishedCounts {
                stories: self.stories,
                videos: self.videos,
                shots: self.shots,
            },
            total_likes_received: self.likes_received,
        };
        (self.user.into(), counts)
    }
}

#[async_trait]
impl PointsRepo for PostgresRepositories {
    async fn profile_counts(&self, user_id: Uuid) -> Result<ProfileCounts, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {USER_COLUMNS}, {PROFILE_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(row.into_parts().1)
    }

    async fn all_profile_counts(&self) -> Result<Vec<(UserRecord, ProfileCounts)>, RepoError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {USER_COLUMNS}, {PROFILE_COLUMNS} FROM users u"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProfileRow::into_parts).collect())
    }
}
