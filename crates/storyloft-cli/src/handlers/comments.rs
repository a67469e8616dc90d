use reqwest::Method;
use storyloft_api_types::{
    CommentCreateRequest, CommentTargetKind, CommentView, LikeResponse, VoteDirection,
};

use crate::args::CommentsCmd;
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::print::print_json;

pub async fn handle(client: &ApiClient, cmd: CommentsCmd) -> Result<(), ClientError> {
    match cmd {
        CommentsCmd::List { target, id } => {
            let target = CommentTargetKind::from(target);
            let path = format!("api/comments/{}/{id}", target.as_str());
            let res: Vec<CommentView> = client.get(&path, &[]).await?;
            print_json(&res)
        }
        CommentsCmd::Post {
            target,
            id,
            content,
            parent,
        } => {
            let payload = CommentCreateRequest {
                target_kind: target.into(),
                target_id: id,
                content,
                parent_id: parent,
                selected_text: None,
                text_position: None,
            };
            let res: CommentView = client.post("api/comments", &payload).await?;
            print_json(&res)
        }
        CommentsCmd::Vote { id, direction } => {
            let res = client
                .vote_comment(id, VoteDirection::from(direction))
                .await?;
            print_json(&res)
        }
        CommentsCmd::Like { id } => {
            let path = format!("api/comments/{id}/like");
            let res: LikeResponse = client.post(&path, &serde_json::json!({})).await?;
            print_json(&res)
        }
        CommentsCmd::Delete { id } => {
            let path = format!("api/comments/{id}");
            client.send_unit(Method::DELETE, &path, None).await?;
            println!("deleted");
            Ok(())
        }
    }
}
