pub mod resource;
pub mod workcell;

pub use resource::HttpResourceClient;
pub use workcell::HttpWorkcellClient;

use reqwest::Url;

use ferry_core::error::{FerryError, Result};

/// Parse a configured service URL that paths can be appended to.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| FerryError::Config(format!("invalid service URL '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(FerryError::Config(format!(
            "service URL '{}' cannot have a path",
            raw
        )));
    }
    Ok(url)
}

/// Append path segments to `base`. Each segment is percent-encoded, so ids
/// containing `/` or `?` stay a single segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
