//! Small shared helpers: proof-image handling, link shortening, and the
//! spam heuristic used for off-script messages.

use crate::errors::{Error, Result};
use rand::{Rng, distributions::Alphanumeric};
use std::path::{Path, PathBuf};

/// Phrases that mark an off-script message as spam regardless of its shape.
const SPAM_PHRASES: &[&str] = &[
    "http://",
    "https://",
    "t.me/",
    "joinchat",
    "bit.ly",
    "earn money",
    "free money",
    "giveaway",
    "click here",
    "subscribe",
];

/// Crude spam check for free-text messages the checkout flow did not ask for.
/// A message is spam when it contains a known phrase or when more than 30% of
/// its characters are neither alphanumeric nor whitespace.
#[must_use]
pub fn is_spam(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if SPAM_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    special * 10 > total * 3
}

/// MD5 hex digest of an uploaded proof image, used to catch resubmissions.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Upload size cap for proof images.
pub const MAX_PROOF_BYTES: usize = 16 * 1024 * 1024;

/// Whether the bytes decode as an image we accept as payment proof.
#[must_use]
pub fn is_valid_image(bytes: &[u8]) -> bool {
    bytes.len() <= MAX_PROOF_BYTES && image::load_from_memory(bytes).is_ok()
}

fn proof_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("jpg")
}

/// Builds the collision-resistant filename proofs are stored under:
/// `<telegram_id>_<unix_ts>_<8 random chars>.<ext>`.
#[must_use]
pub fn proof_filename(telegram_id: &str, bytes: &[u8]) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!(
        "{telegram_id}_{}_{suffix}.{}",
        chrono::Utc::now().timestamp(),
        proof_extension(bytes)
    )
}

/// Writes a proof image under `upload_dir`, creating the directory if needed.
/// Returns the filename (not the full path) for storage on the payment row.
pub async fn save_proof_image(
    upload_dir: &Path,
    telegram_id: &str,
    bytes: &[u8],
) -> Result<String> {
    if !is_valid_image(bytes) {
        return Err(Error::Validation {
            message: "Uploaded file is not a readable image".to_string(),
        });
    }

    tokio::fs::create_dir_all(upload_dir).await?;
    let filename = proof_filename(telegram_id, bytes);
    let full_path: PathBuf = upload_dir.join(&filename);
    tokio::fs::write(&full_path, bytes).await?;
    Ok(filename)
}

/// Shortens a deliverable link via the TinyURL endpoint. Any failure falls
/// back to the original link; delivery must not depend on a third party.
pub async fn shorten_url(link: &str) -> String {
    let endpoint = match url::Url::parse_with_params(
        "https://tinyurl.com/api-create.php",
        &[("url", link)],
    ) {
        Ok(endpoint) => endpoint,
        Err(error) => {
            tracing::warn!(%error, link, "could not build shortener request");
            return link.to_string();
        }
    };

    match reqwest::get(endpoint).await {
        Ok(response) => match response.text().await {
            Ok(short) if short.starts_with("http") => short,
            Ok(_) | Err(_) => {
                tracing::warn!(link, "shortener returned an unusable response");
                link.to_string()
            }
        },
        Err(error) => {
            tracing::warn!(%error, link, "shortener request failed");
            link.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::tiny_png;

    #[test]
    fn test_spam_phrases() {
        assert!(is_spam("EARN MONEY fast, join t.me/scamchannel"));
        assert!(is_spam("visit https://example.com now"));
        assert!(!is_spam("Do you have a course about machine learning?"));
    }

    #[test]
    fn test_spam_special_character_ratio() {
        assert!(is_spam("$$$ !!! @@@ ###"));
        assert!(!is_spam("A perfectly normal sentence, with one comma."));
        assert!(!is_spam(""));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let bytes = b"proof image bytes";
        assert_eq!(fingerprint(bytes), fingerprint(bytes));
        assert_ne!(fingerprint(bytes), fingerprint(b"other bytes"));
        assert_eq!(fingerprint(bytes).len(), 32);
    }

    #[test]
    fn test_image_validation() {
        assert!(is_valid_image(&tiny_png()));
        assert!(!is_valid_image(b"definitely not an image"));
    }

    #[test]
    fn test_proof_filename_shape() {
        let name = proof_filename("123456", &tiny_png());
        assert!(name.starts_with("123456_"));
        assert!(name.ends_with(".png"));
        // telegram id, timestamp, random suffix
        assert_eq!(name.split('_').count(), 3);
    }

    #[tokio::test]
    async fn test_save_rejects_garbage() {
        let dir = std::env::temp_dir().join("coursebot-test-uploads");
        let result = save_proof_image(&dir, "123", b"garbage").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_save_writes_valid_image() -> crate::errors::Result<()> {
        let dir = std::env::temp_dir().join(format!(
            "coursebot-test-uploads-{}",
            std::process::id()
        ));
        let filename = save_proof_image(&dir, "123", &tiny_png()).await?;
        let stored = tokio::fs::read(dir.join(&filename)).await?;
        assert_eq!(stored, tiny_png());
        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }
}
