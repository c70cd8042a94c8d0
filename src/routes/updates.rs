use crate::bot::{Inbound, MessageContent};
use crate::models::{ItemContent, ItemKind, UserId};
use crate::AppState;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

/// A message as the transport adapter forwards it.
#[derive(Deserialize, Debug)]
pub struct MessagePayload {
    /// `text`, `photo`, `document`, `video`, `audio`, `animation`, or anything else.
    pub kind: String,
    pub text: Option<String>,
    pub file_id: Option<String>,
    pub caption: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdatePayload {
    Callback { from: UserId, data: String },
    Message { from: UserId, message: MessagePayload },
}

impl MessagePayload {
    fn into_content(self) -> Result<MessageContent, String> {
        let kind = match self.kind.parse::<ItemKind>() {
            Ok(kind) => kind,
            Err(_) => return Ok(MessageContent::Unsupported(self.kind)),
        };
        let content = match kind.media() {
            None => ItemContent::Text {
                body: self.text.ok_or("text message without 'text'")?,
            },
            Some(media) => ItemContent::Media {
                media,
                file_id: self.file_id.ok_or("media message without 'file_id'")?,
                caption: self.caption.filter(|c| !c.is_empty()),
            },
        };
        Ok(MessageContent::Item(content))
    }
}

impl TryFrom<UpdatePayload> for Inbound {
    type Error = String;

    fn try_from(payload: UpdatePayload) -> Result<Self, Self::Error> {
        Ok(match payload {
            UpdatePayload::Callback { from, data } => Inbound::Callback { from, data },
            UpdatePayload::Message { from, message } => Inbound::Message {
                from,
                content: message.into_content()?,
            },
        })
    }
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/updates", web::post().to(receive_update));
}

async fn receive_update(
    app_state: web::Data<AppState>,
    payload: web::Json<UpdatePayload>,
) -> impl Responder {
    let inbound = match Inbound::try_from(payload.into_inner()) {
        Ok(inbound) => inbound,
        Err(reason) => {
            log::warn!("Malformed update: {}", reason);
            return HttpResponse::BadRequest().json(serde_json::json!({ "error": reason }));
        }
    };

    let outbound = app_state.dispatcher.handle(inbound);
    HttpResponse::Ok().json(outbound)
}

pub async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "active": true }))
}
