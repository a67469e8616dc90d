use reqwest::Method;
use storyloft_api_types::{
    ContentCreateRequest, ContentKind, ContentListResponse, ContentView, ShareLink,
};
use uuid::Uuid;

use crate::args::{ContentCmd, KindArg};
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::io::read_opt_value;
use crate::optimistic::{LikeState, Optimistic};
use crate::print::print_json;

pub async fn handle(client: &ApiClient, cmd: ContentCmd) -> Result<(), ClientError> {
    match cmd {
        ContentCmd::List {
            kind,
            search,
            tag,
            page,
            page_size,
        } => {
            let mut q = vec![("page", page.to_string()), ("page_size", page_size.to_string())];
            if let Some(s) = search {
                q.push(("search", s));
            }
            if let Some(t) = tag {
                q.push(("tag", t));
            }
            let res: ContentListResponse = client.get(&collection(kind), &q).await?;
            print_json(&res)
        }
        ContentCmd::Mine { kind } => {
            let path = format!("{}/mine", collection(kind));
            let res: ContentListResponse = client.get(&path, &[]).await?;
            print_json(&res)
        }
        ContentCmd::Get { kind, id } => {
            let res: ContentView = client.get(&item(kind, id), &[]).await?;
            print_json(&res)
        }
        ContentCmd::Create {
            kind,
            title,
            body,
            body_file,
            media_url,
            thumbnail_url,
            tags,
            mature,
            submit,
        } => {
            let payload = ContentCreateRequest {
                title,
                body: read_opt_value(body, body_file)?.unwrap_or_default(),
                media_url,
                thumbnail_url,
                tags,
                mature_content: mature,
                submit,
            };
            let res: ContentView = client.post(&collection(kind), &payload).await?;
            print_json(&res)
        }
        ContentCmd::Submit { kind, id } => {
            let path = format!("{}/submit", item(kind, id));
            let res: ContentView = client.post(&path, &serde_json::json!({})).await?;
            print_json(&res)
        }
        ContentCmd::Delete { kind, id } => {
            client
                .send_unit(Method::DELETE, &item(kind, id), None)
                .await?;
            println!("deleted");
            Ok(())
        }
        ContentCmd::AcknowledgeMature { kind, id } => {
            let path = format!("{}/acknowledge-mature", item(kind, id));
            client.send_unit(Method::POST, &path, None).await?;
            println!("acknowledged");
            Ok(())
        }
        ContentCmd::Share { kind, id } => {
            let path = format!("{}/share", item(kind, id));
            let res: ShareLink = client.get(&path, &[]).await?;
            print_json(&res)
        }
    }
}

/// Toggles a like, printing the tentative state before the server answers.
pub async fn like(client: &ApiClient, kind: KindArg, id: Uuid) -> Result<(), ClientError> {
    let kind = ContentKind::from(kind);
    let current: ContentView = client
        .get(&format!("api/{}/{id}", kind.collection()), &[])
        .await?;
    let liked = client.is_liked(kind, id).await?;

    let mut state = Optimistic::new(LikeState {
        liked,
        total_likes: current.likes_count,
    });
    let tentative = state.get().toggled();
    println!(
        "{} ({} likes)...",
        if tentative.liked { "liking" } else { "unliking" },
        tentative.total_likes
    );

    match client.toggle_like_optimistic(&mut state, kind, id).await {
        Ok(res) => print_json(&res),
        Err(err) => {
            eprintln!(
                "like failed; still {} with {} likes",
                if state.get().liked { "liked" } else { "not liked" },
                state.get().total_likes
            );
            Err(err)
        }
    }
}

fn collection(kind: KindArg) -> String {
    format!("api/{}", ContentKind::from(kind).collection())
}

fn item(kind: KindArg, id: Uuid) -> String {
    format!("{}/{id}", collection(kind))
}
