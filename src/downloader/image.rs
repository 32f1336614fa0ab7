//! Single image downloads.

use crate::error::{Error, Result};
use crate::media;
use crate::types::AssetDescriptor;
use crate::utils::{is_safe_component, set_modified_time, write_atomic};

use super::MediaDownloader;

/// On-disk file name for a shortcode and optional sub-image index
///
/// ```
/// use media_syncer::downloader::image_file_name;
///
/// assert_eq!(image_file_name("ABC", None), "ABC.jpg");
/// assert_eq!(image_file_name("ABC", Some(2)), "ABC_2.jpg");
/// ```
pub fn image_file_name(shortcode: &str, image_index: Option<u32>) -> String {
    match image_index {
        Some(index) => format!("{shortcode}_{index}.jpg"),
        None => format!("{shortcode}.jpg"),
    }
}

impl MediaDownloader {
    /// Download one image to `images/{shortcode}/{file}` and describe it.
    ///
    /// An existing file is a cache hit: the descriptor comes back without any
    /// network call. On a miss the post is looked up, the selected node is
    /// fetched, and the file is stamped with the post's timestamp.
    pub async fn download_image(
        &self,
        shortcode: &str,
        record_id: &str,
        image_index: Option<u32>,
    ) -> Result<AssetDescriptor> {
        if !is_safe_component(shortcode) {
            return Err(Error::ResolutionFailed {
                shortcode: shortcode.to_string(),
                reason: "shortcode is not a valid path component".to_string(),
            });
        }

        let _guard = self.locks.lock(shortcode).await;

        let dir = self.config.storage.images_dir().join(shortcode);
        let requested = image_file_name(shortcode, image_index);
        if tokio::fs::try_exists(dir.join(&requested)).await? {
            tracing::debug!(shortcode, file = %requested, "image already downloaded");
            return Ok(self.image_descriptor(shortcode, &requested, record_id));
        }

        let post = self.introspector.lookup(shortcode).await?;
        let located = media::select(&post, image_index)?;

        // An index on a single-media post lands on the plain file name
        let file_name = image_file_name(shortcode, located.image_index);
        let path = dir.join(&file_name);
        if file_name != requested && tokio::fs::try_exists(&path).await? {
            tracing::debug!(shortcode, file = %file_name, "image already downloaded");
            return Ok(self.image_descriptor(shortcode, &file_name, record_id));
        }

        let bytes = self.fetch_bytes(&located.url).await?;
        write_atomic(&path, &bytes).await?;
        set_modified_time(&path, post.taken_at)?;

        tracing::info!(
            shortcode,
            record_id,
            file = %file_name,
            bytes = bytes.len(),
            "downloaded image"
        );
        Ok(self.image_descriptor(shortcode, &file_name, record_id))
    }

    fn image_descriptor(&self, shortcode: &str, file_name: &str, record_id: &str) -> AssetDescriptor {
        AssetDescriptor {
            asset_file_url: self
                .config
                .api
                .asset_url(&format!("images/{shortcode}/{file_name}")),
            external_id: record_id.to_string(),
        }
    }
}
