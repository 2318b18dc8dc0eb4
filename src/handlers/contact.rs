use axum::{extract::State, Json};
use validator::Validate;

use crate::config::Config;
use crate::dto::{ContactRequest, ContactResponse};
use crate::error::{AppError, AppResult};
use crate::AppState;

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

pub async fn send_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> AppResult<Json<ContactResponse>> {
    body.validate()?;

    let (Some(api_key), Some(recipient)) = (
        state.config.resend_api_key.as_deref(),
        state.config.contact_recipient.as_deref(),
    ) else {
        tracing::warn!("Contact form submitted but mail relay is not configured");
        return Err(AppError::Unavailable(
            "Contact delivery is not configured".into(),
        ));
    };

    let id = relay_contact_email(&state.config, api_key, recipient, &body).await?;

    tracing::info!(message_id = ?id, "Contact message relayed");

    Ok(Json(ContactResponse { success: true, id }))
}

fn render_body(req: &ContactRequest) -> String {
    format!(
        "New contact form submission\n\nName: {}\nEmail: {}\nSubject: {}\n\n{}\n",
        req.name, req.email, req.subject, req.message
    )
}

async fn relay_contact_email(
    config: &Config,
    api_key: &str,
    recipient: &str,
    req: &ContactRequest,
) -> Result<Option<String>, anyhow::Error> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()?;

    let response = client
        .post(RESEND_EMAILS_URL)
        .bearer_auth(api_key)
        .json(&serde_json::json!({
            "from": config.contact_sender,
            "to": [recipient],
            "subject": format!("Contact Form: {}", req.subject),
            "reply_to": req.email,
            "text": render_body(req),
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Mail relay error {}: {}", status, body);
    }

    let sent: serde_json::Value = response.json().await?;
    Ok(sent["id"].as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body_includes_all_fields() {
        let req = ContactRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            subject: "Charts".into(),
            message: "The weight chart looks great.".into(),
        };
        let body = render_body(&req);
        assert!(body.contains("Name: Ada"));
        assert!(body.contains("Email: ada@example.com"));
        assert!(body.contains("Subject: Charts"));
        assert!(body.ends_with("The weight chart looks great.\n"));
    }
}
