use storyloft_api_types::{LeaderboardResponse, PointsBreakdown, ReferralInfo, UserStats};

use crate::args::PointsCmd;
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::print::print_json;

pub async fn handle(client: &ApiClient, cmd: PointsCmd) -> Result<(), ClientError> {
    match cmd {
        PointsCmd::Stats => {
            let res: UserStats = client.get("api/users/me/stats", &[]).await?;
            print_json(&res)
        }
        PointsCmd::Breakdown => {
            let res: PointsBreakdown = client.get("api/users/me/points", &[]).await?;
            print_json(&res)
        }
        PointsCmd::Referral => {
            let res: ReferralInfo = client.get("api/users/me/referral", &[]).await?;
            print_json(&res)
        }
        PointsCmd::Leaderboard { limit } => {
            let res: LeaderboardResponse = client
                .get("api/users/leaderboard", &[("limit", limit.to_string())])
                .await?;
            print_json(&res)
        }
    }
}
