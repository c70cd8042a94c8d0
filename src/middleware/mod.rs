use actix_web::guard;

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Lets a request through only when it carries the configured webhook secret.
pub fn webhook_secret_guard(ctx: &guard::GuardContext, expected: &str) -> bool {
    let provided = match ctx
        .head()
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(secret) => secret,
        None => {
            log::warn!("Rejected update without the {} header.", WEBHOOK_SECRET_HEADER);
            return false;
        }
    };

    let is_allowed = constant_time_eq(provided.as_bytes(), expected.as_bytes());
    if !is_allowed {
        let peer = ctx
            .head()
            .peer_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        log::warn!("Rejected update with a wrong webhook secret from {}", peer);
    }
    is_allowed
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
