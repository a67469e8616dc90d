use storyloft_api_types::{ErrorsResponse, MetricsSummary};

use crate::args::MonitoringCmd;
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::print::print_json;

pub async fn handle(client: &ApiClient, cmd: MonitoringCmd) -> Result<(), ClientError> {
    match cmd {
        MonitoringCmd::Summary => {
            let res: MetricsSummary = client.get("api/monitoring/metrics", &[]).await?;
            print_json(&res)
        }
        MonitoringCmd::Errors { limit } => {
            let res: ErrorsResponse = client
                .get("api/monitoring/metrics/errors", &[("limit", limit.to_string())])
                .await?;
            print_json(&res)
        }
    }
}
