//! User-visible texts produced by the pipeline.

use mediarelay_transfer::Requester;

use crate::types::LinkButton;

pub const STATUS_DOWNLOADING: &str = "Downloading";
pub const STATUS_DOWNLOADED: &str = "Downloaded";
pub const STATUS_UPLOADING: &str = "Uploading";

/// Initial text of the status message, before the first progress render.
pub const SENDING_MEDIA: &str = "Sending you the media... 🤤";

/// Shown between the end of the download and the first upload render.
pub const UPLOADING: &str = "Uploading...";

pub const UPLOAD_FAILED: &str = "❌ Upload failed. Please try again later.";

pub const MANUAL_DOWNLOAD: &str =
    "Failed to download automatically. Please use the link below to download manually.";

const DIRECT_DOWNLOAD_LABEL: &str = "📥 Direct Download";

/// Terminal text when the request could not be processed at all.
pub fn request_failed(max_file_size_mb: u64) -> String {
    format!(
        "Failed to process your request.\n\
         If your file size is more than {max_file_size_mb}MB it might fail to download."
    )
}

/// Button that lets the user fetch the file themselves.
pub fn direct_download_button(direct_link: &str) -> LinkButton {
    LinkButton::new(DIRECT_DOWNLOAD_LABEL, direct_link)
}

/// Caption attached to the uploaded video.
pub fn upload_caption(title: &str, requester: &Requester) -> String {
    format!(
        "✨ {title}\n👤 Leeched by: {}\n📥 User link: tg://user?id={}",
        requester.display, requester.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_mentions_size_limit() {
        let text = request_failed(120);
        assert!(text.starts_with("Failed to process your request."));
        assert!(text.contains("more than 120MB"));
    }

    #[test]
    fn caption_links_requester() {
        let requester = Requester::new(42, "alice");
        assert_eq!(
            upload_caption("clip.mp4", &requester),
            "✨ clip.mp4\n👤 Leeched by: alice\n📥 User link: tg://user?id=42"
        );
    }

    #[test]
    fn direct_download_button_points_at_link() {
        let button = direct_download_button("https://cdn.example/f.mp4");
        assert_eq!(button.url, "https://cdn.example/f.mp4");
        assert_eq!(button.label, "📥 Direct Download");
    }
}
