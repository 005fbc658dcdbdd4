use reqwest::Url;

use crate::error::CoreError;

pub(super) fn resolve_auth(
    user: Option<&str>,
    pass: Option<&str>,
) -> Result<Option<(String, String)>, CoreError> {
    match (user, pass) {
        (Some(u), Some(p)) => Ok(Some((u.to_owned(), p.to_owned()))),
        (Some(_), None) | (None, Some(_)) => Err(CoreError::Configuration(
            "both rpc user and rpc pass must be set together".to_owned(),
        )),
        (None, None) => Ok(None),
    }
}

/// Normalise a configured node address into an HTTP(S) URL.
///
/// Bare `host:port` addresses (the usual form for node hosts) are treated
/// as plain HTTP.
pub(super) fn parse_connection(address: &str) -> Result<Url, CoreError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(CoreError::Configuration(
            "endpoint address must not be empty".to_owned(),
        ));
    }

    let candidate = if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| {
        CoreError::Configuration(format!(
            "invalid endpoint `{address}`: expected host:port or HTTP(S) URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CoreError::Configuration(format!(
            "unsupported endpoint scheme `{other}` in `{address}`; expected http or https"
        ))),
    }
}
