use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes behind each approval token.
pub const TOKEN_BYTES: usize = 20;

/// Fresh approval token: 20 bytes from the OS CSPRNG, lowercase hex.
pub fn generate_approval_token() -> String {
    let mut random_bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut random_bytes);
    hex::encode(random_bytes)
}

/// Shortened form for log lines. Tokens are capabilities and never logged whole.
pub fn redact(token: &str) -> String {
    match token.get(..6) {
        Some(prefix) if token.len() > 12 => format!("{}…", prefix),
        _ => "****".to_string(),
    }
}
