//! Post bundle downloads and the post batch.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::media::ShortcodeMap;
use crate::types::{Event, Record, Stage};
use crate::utils::{is_safe_component, set_modified_time, write_atomic};

use super::{MediaDownloader, package_archive};

/// Outcome of a post batch
#[derive(Clone, Debug, Serialize)]
pub struct PostBatchReport {
    /// Archive of the whole posts directory
    pub archive_path: PathBuf,
    /// Public URL of the archive
    pub archive_url: String,
    /// Records whose bundle is on disk (downloaded now or earlier)
    pub downloaded: usize,
    /// Records whose bundle could not be downloaded
    pub failed: Vec<String>,
}

impl MediaDownloader {
    /// Download every media node, the metadata and the caption of a post into `posts/{record_id}`.
    ///
    /// An existing directory counts as already downloaded. Returns `false` on
    /// failure after logging the cause and removing the partial directory.
    pub async fn download_post(&self, shortcode: &str, record_id: &str) -> bool {
        if !is_safe_component(shortcode) || !is_safe_component(record_id) {
            tracing::warn!(shortcode, record_id, "refusing unsafe post path");
            return false;
        }

        // Held across the existence check, the write and any cleanup
        let _guard = self.locks.lock(shortcode).await;

        let target = self.config.storage.posts_dir().join(record_id);
        match tokio::fs::try_exists(&target).await {
            Ok(true) => {
                tracing::debug!(shortcode, record_id, "post already downloaded");
                return true;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(record_id, error = %e, "could not check post directory");
                return false;
            }
        }

        match self.write_post_bundle(shortcode, &target).await {
            Ok(files) => {
                tracing::info!(shortcode, record_id, files, "downloaded post");
                true
            }
            Err(e) => {
                tracing::warn!(shortcode, record_id, error = %e, "post download failed");
                if let Err(cleanup) = tokio::fs::remove_dir_all(&target).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(path = %target.display(), error = %cleanup, "could not remove partial post");
                }
                false
            }
        }
    }

    async fn write_post_bundle(&self, shortcode: &str, target: &Path) -> Result<usize> {
        let post = self.introspector.lookup(shortcode).await?;

        tokio::fs::create_dir_all(target).await?;

        let nodes = post.nodes();
        let numbered = nodes.len() > 1;
        let mut written = Vec::with_capacity(nodes.len() + 2);

        for (i, node) in nodes.iter().enumerate() {
            let name = if numbered {
                format!("{shortcode}_{}.{}", i + 1, node.bundle_extension())
            } else {
                format!("{shortcode}.{}", node.bundle_extension())
            };
            let bytes = self.fetch_bytes(node.bundle_url()).await?;
            let path = target.join(name);
            write_atomic(&path, &bytes).await?;
            written.push(path);
        }

        let metadata_path = target.join(format!("{shortcode}.json"));
        write_atomic(&metadata_path, &serde_json::to_vec_pretty(&post.metadata)?).await?;
        written.push(metadata_path);

        if let Some(caption) = &post.caption {
            let caption_path = target.join(format!("{shortcode}.txt"));
            write_atomic(&caption_path, caption.as_bytes()).await?;
            written.push(caption_path);
        }

        for path in &written {
            set_modified_time(path, post.taken_at)?;
        }
        Ok(written.len())
    }

    /// Download a bundle per record and zip the whole posts directory.
    ///
    /// Resolution errors and the limit abort the batch before any I/O; a
    /// bundle that fails to download is reported in [`PostBatchReport::failed`].
    pub async fn download_posts(&self, records: &[Record]) -> Result<PostBatchReport> {
        let map = ShortcodeMap::build(records)?;
        self.enforce_limit(map.len())?;

        let posts_dir = self.config.storage.posts_dir();
        tokio::fs::create_dir_all(&posts_dir).await?;

        self.emit(Event::StageStarted {
            stage: Stage::DownloadingPosts,
            total: Some(map.len() as u64),
        });

        let mut downloaded = 0;
        let mut failed = Vec::new();
        for (completed, (id, target)) in map.iter().enumerate() {
            if self.download_post(&target.shortcode, id).await {
                downloaded += 1;
            } else {
                self.emit(Event::ItemSkipped {
                    stage: Stage::DownloadingPosts,
                    external_id: id.to_string(),
                    reason: format!("post {} could not be downloaded", target.shortcode),
                });
                failed.push(id.to_string());
            }
            self.emit(Event::Progress {
                stage: Stage::DownloadingPosts,
                completed: completed as u64 + 1,
            });
        }

        let archive_path = tokio::task::spawn_blocking(move || package_archive(&posts_dir))
            .await
            .map_err(|e| Error::Other(format!("archive task failed: {e}")))??;

        let file_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let archive_url = self.config.api.asset_url(&file_name);

        self.emit(Event::StageCompleted {
            stage: Stage::DownloadingPosts,
        });

        Ok(PostBatchReport {
            archive_path,
            archive_url,
            downloaded,
            failed,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::super::test_helpers::*;
    use super::*;
    use chrono::DateTime;
    use crate::media::MediaNode;

    #[tokio::test]
    async fn bundle_contains_media_metadata_and_caption() {
        let cdn = cdn_server().await;
        let harness = Harness::new(10);
        let mut post = sidecar_post("ABC", 2, &cdn);
        post.children.push(MediaNode {
            display_url: format!("{}/ABC/poster.jpg", cdn.uri()),
            is_video: true,
            video_url: Some(format!("{}/ABC/clip.mp4", cdn.uri())),
        });
        harness.introspector.add(post);

        assert!(harness.downloader.download_post("ABC", "rec1").await);

        let dir = harness.data_dir().join("posts/rec1");
        let mut names: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["ABC.json", "ABC.txt", "ABC_1.jpg", "ABC_2.jpg", "ABC_3.mp4"]
        );

        let modified = std::fs::metadata(dir.join("ABC.txt"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(DateTime::<chrono::Utc>::from(modified), taken_at());

        let paths: Vec<_> = cdn
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert!(paths.contains(&"/ABC/clip.mp4".to_string()));
    }

    #[tokio::test]
    async fn existing_post_directory_is_skipped() {
        let cdn = cdn_server().await;
        let harness = Harness::new(10);
        std::fs::create_dir_all(harness.data_dir().join("posts/rec1")).unwrap();

        assert!(harness.downloader.download_post("ABC", "rec1").await);
        assert_eq!(harness.introspector.lookups(), 0);
        assert!(cdn.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_requests_for_one_post_download_it_once() {
        let cdn = cdn_server().await;
        let harness = Harness::new(10);
        harness.introspector.add(sidecar_post("AAA", 2, &cdn));

        let first = harness.downloader.clone();
        let second = harness.downloader.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.download_post("AAA", "rec1").await }),
            tokio::spawn(async move { second.download_post("AAA", "rec1").await }),
        );

        assert!(a.unwrap());
        assert!(b.unwrap());
        assert_eq!(harness.introspector.lookups(), 1);
        assert_eq!(cdn.received_requests().await.unwrap().len(), 2);
        assert!(harness.data_dir().join("posts/rec1/AAA_2.jpg").exists());
    }

    #[tokio::test]
    async fn failed_post_returns_false_and_cleans_up() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let cdn = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&cdn)
            .await;

        let harness = Harness::new(10);
        harness.introspector.add(single_post("ABC", &cdn));

        assert!(!harness.downloader.download_post("ABC", "rec1").await);
        assert!(!harness.data_dir().join("posts/rec1").exists());

        assert!(!harness.downloader.download_post("NOPE", "rec2").await);
        assert!(!harness.downloader.download_post("ABC", "../escape").await);
    }

    #[tokio::test]
    async fn post_batch_archives_posts_directory() {
        let cdn = cdn_server().await;
        let harness = Harness::new(10);
        harness.introspector.add(single_post("AAA", &cdn));

        let records = vec![
            record("rec1", "https://instagram.com/p/AAA/"),
            record("rec2", "https://instagram.com/p/MISSING/"),
        ];

        let report = harness.downloader.download_posts(&records).await.unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failed, vec!["rec2"]);
        assert!(report.archive_path.exists());
        assert_eq!(report.archive_path.parent().unwrap(), harness.data_dir());
        assert!(
            report
                .archive_url
                .starts_with("http://media.test/downloads/")
        );
        assert!(report.archive_url.ends_with(".zip"));
    }

    #[tokio::test]
    async fn post_batch_over_limit_touches_nothing() {
        let cdn = cdn_server().await;
        let harness = Harness::new(1);

        let records = vec![
            record("rec1", "https://instagram.com/p/AAA/"),
            record("rec2", "https://instagram.com/p/BBB/"),
        ];

        let err = harness.downloader.download_posts(&records).await.unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { .. }));
        assert!(!harness.data_dir().exists());
        assert!(cdn.received_requests().await.unwrap().is_empty());
    }
}
