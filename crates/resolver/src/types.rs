//! API response types for the link-resolution service.

use serde::{Deserialize, Serialize};

/// Raw response body. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub direct_link: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// A share link resolved to something the download manager can fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub direct_link: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl ApiResponse {
    /// Validates the response; `None` when no direct link is present.
    pub(crate) fn into_resolved(self) -> Option<ResolvedLink> {
        let direct_link = self.direct_link.filter(|l| !l.trim().is_empty())?;
        let file_name = self
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| file_name_from_url(&direct_link));
        Some(ResolvedLink {
            direct_link,
            file_name,
            thumbnail_url: self.thumb.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Last path segment of `url`, without query or fragment.
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("download")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_response() {
        let json = r#"{"direct_link":"https://d.example/v.mp4","file_name":"v.mp4","thumb":"https://t.example/v.jpg"}"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        let link = resp.into_resolved().unwrap();
        assert_eq!(link.file_name, "v.mp4");
        assert_eq!(link.thumbnail_url.as_deref(), Some("https://t.example/v.jpg"));
    }

    #[test]
    fn missing_direct_link() {
        let resp: ApiResponse = serde_json::from_str(r#"{"file_name":"v.mp4"}"#).unwrap();
        assert!(resp.into_resolved().is_none());

        let resp: ApiResponse = serde_json::from_str(r#"{"direct_link":"  "}"#).unwrap();
        assert!(resp.into_resolved().is_none());
    }

    #[test]
    fn file_name_falls_back_to_url() {
        let resp: ApiResponse =
            serde_json::from_str(r#"{"direct_link":"https://d.example/a/b/clip.mkv?sig=1","thumb":""}"#)
                .unwrap();
        let link = resp.into_resolved().unwrap();
        assert_eq!(link.file_name, "clip.mkv");
        assert!(link.thumbnail_url.is_none());
    }

    #[test]
    fn bare_host_falls_back_to_default() {
        assert_eq!(file_name_from_url("https://d.example/"), "d.example");
        assert_eq!(file_name_from_url("https://"), "download");
    }
}
