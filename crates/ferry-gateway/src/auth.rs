use ferry_core::config::GatewayConfig;

/// Bearer header first, then `?token=`. No configured token means open access.
pub fn validate_auth(
    config: &GatewayConfig,
    bearer: Option<&str>,
    query_token: Option<&str>,
) -> bool {
    match config.token.as_deref() {
        None => true,
        Some(expected) => bearer.or(query_token) == Some(expected),
    }
}

/// Extract token from the query string (?token=...).
pub fn extract_token_from_query(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| pair.strip_prefix("token="))
}
