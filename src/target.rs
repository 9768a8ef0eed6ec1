use url::Url;

/// Loopback authority that is only meaningful on the developer's host.
pub const LOOPBACK_BACKEND: &str = "localhost:8000";

/// Name under which the backend is reachable inside the container network.
pub const CLUSTER_BACKEND: &str = "backend:8000";

/// Rewrite a raw destination into the URL that is actually dispatched.
///
/// Paths (`/health`) are appended to `base_url`. Otherwise the first
/// occurrence of `localhost:8000` is replaced by `backend:8000`; this is a
/// plain text substitution, so the marker is also rewritten when it appears
/// in a path or query. Anything else passes through untouched, including
/// malformed URLs, which fail later when they are probed.
pub fn resolve(raw: &str, base_url: &str) -> String {
    if raw.starts_with('/') && !raw.starts_with("http") {
        format!("{base_url}{raw}")
    } else if raw.contains(LOOPBACK_BACKEND) {
        raw.replacen(LOOPBACK_BACKEND, CLUSTER_BACKEND, 1)
    } else {
        raw.to_string()
    }
}

/// A destination as supplied by the caller, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    name: String,
    raw: String,
    url: String,
}

impl ProbeTarget {
    pub fn new(name: impl Into<String>, raw: impl Into<String>, base_url: &str) -> Self {
        let raw = raw.into();
        let url = resolve(&raw, base_url);
        if !is_absolute(&url) {
            tracing::debug!(%raw, %url, "target did not resolve to an absolute URL");
        }
        Self {
            name: name.into(),
            raw,
            url,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Whether `url` carries both a scheme and a host.
pub fn is_absolute(url: &str) -> bool {
    Url::parse(url).map(|u| u.has_host()).unwrap_or(false)
}
