use storyloft_api_types::{
    ApprovalRequest, ContentKind, ContentListResponse, ContentView, DashboardResponse,
};

use crate::args::ModerationCmd;
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::print::print_json;

pub async fn handle(client: &ApiClient, cmd: ModerationCmd) -> Result<(), ClientError> {
    match cmd {
        ModerationCmd::Pending { kind, page } => {
            let path = format!("api/{}/pending", ContentKind::from(kind).collection());
            let res: ContentListResponse = client.get(&path, &[("page", page.to_string())]).await?;
            print_json(&res)
        }
        ModerationCmd::Approve { kind, id } => {
            decide(
                client,
                kind.into(),
                id,
                ApprovalRequest {
                    approved: true,
                    rejection_reason: None,
                },
            )
            .await
        }
        ModerationCmd::Reject { kind, id, reason } => {
            if reason.trim().is_empty() {
                return Err(ClientError::InvalidInput(
                    "a rejection reason is required".to_string(),
                ));
            }
            decide(
                client,
                kind.into(),
                id,
                ApprovalRequest {
                    approved: false,
                    rejection_reason: Some(reason),
                },
            )
            .await
        }
        ModerationCmd::Dashboard => {
            let res: DashboardResponse = client.get("api/admin/dashboard", &[]).await?;
            print_json(&res)
        }
    }
}

async fn decide(
    client: &ApiClient,
    kind: ContentKind,
    id: uuid::Uuid,
    decision: ApprovalRequest,
) -> Result<(), ClientError> {
    let path = format!("api/{}/{id}/approve", kind.collection());
    let res: ContentView = client.post(&path, &decision).await?;
    print_json(&res)
}
