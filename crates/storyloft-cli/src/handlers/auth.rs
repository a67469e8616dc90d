use reqwest::Method;
use storyloft_api_types::{LogoutRequest, RegisterRequest, RegisterResponse, UserView};

use crate::args::AuthCmd;
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::print::print_json;

pub async fn handle(client: &ApiClient, cmd: AuthCmd) -> Result<(), ClientError> {
    match cmd {
        AuthCmd::Register {
            username,
            anonymous_name,
            referral_code,
            desired_code,
        } => {
            let payload = RegisterRequest {
                username,
                anonymous_name,
                referral_code,
                desired_referral_code: desired_code,
            };
            register(client, &payload).await
        }
        AuthCmd::Me => {
            let me: UserView = client.get("api/auth/me", &[]).await?;
            print_json(&me)
        }
        AuthCmd::Logout => logout(client).await,
    }
}

async fn register(client: &ApiClient, payload: &RegisterRequest) -> Result<(), ClientError> {
    let res: RegisterResponse = client
        .post_anonymous("api/auth/register", payload)
        .await?;
    client.store_tokens(res.tokens.clone()).await?;
    print_json(&res.user)?;
    if payload.referral_code.is_some() && !res.referral_applied {
        eprintln!("referral code not recognised; registered without a referrer");
    }
    Ok(())
}

async fn logout(client: &ApiClient) -> Result<(), ClientError> {
    let refresh_token = client
        .session()
        .current()
        .await
        .map(|session| session.refresh_token);
    let body = serde_json::to_value(LogoutRequest { refresh_token })?;
    let result = client
        .send_unit(Method::POST, "api/auth/logout", Some(body))
        .await;
    // The local session goes away even if the server already forgot it.
    client.session().clear().await?;
    match result {
        Ok(()) | Err(ClientError::Authentication(_)) => {
            println!("logged out");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
