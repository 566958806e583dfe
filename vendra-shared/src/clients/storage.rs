use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};

/// Object storage buckets. Private buckets never hand out public URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Avatars,
    Banners,
    PropertyImages,
    ProjectImages,
    ProjectPlans,
    KycDocs,
    LegalDocs,
}

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Bucket::Avatars,
        Bucket::Banners,
        Bucket::PropertyImages,
        Bucket::ProjectImages,
        Bucket::ProjectPlans,
        Bucket::KycDocs,
        Bucket::LegalDocs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Banners => "banners",
            Bucket::PropertyImages => "property-images",
            Bucket::ProjectImages => "project-images",
            Bucket::ProjectPlans => "project-plans",
            Bucket::KycDocs => "kyc-docs",
            Bucket::LegalDocs => "legal-docs",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Bucket::KycDocs | Bucket::LegalDocs)
    }
}

/// Maps an upload content type to a file extension, or rejects it.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Like [`image_extension`] but also accepts PDFs (plans, KYC scans).
pub fn document_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "application/pdf" => Some("pdf"),
        other => image_extension(other),
    }
}

/// Builds `{owner}/{timestamp}-{random}.{ext}`.
pub fn object_key(owner_id: Uuid, ext: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}/{}-{}.{}", owner_id, Utc::now().timestamp_millis(), suffix.to_lowercase(), ext)
}

#[derive(Clone)]
pub struct StorageClient {
    client: S3Client,
    public_url: String,
}

impl StorageClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "vendra");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Buckets may already exist; creation errors are expected on restart.
        for bucket in Bucket::ALL {
            let _ = client.create_bucket().bucket(bucket.as_str()).send().await;
        }

        tracing::info!(endpoint = %endpoint, "object storage client initialized");

        Self {
            client,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload a file. Returns the public URL for public buckets and the bare key for private ones.
    pub async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(bucket.as_str())
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("upload failed: {e}")))?;

        tracing::debug!(bucket = bucket.as_str(), key = %key, "object uploaded");

        if bucket.is_private() {
            Ok(key.to_string())
        } else {
            Ok(self.public_object_url(bucket, key))
        }
    }

    pub fn public_object_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, bucket.as_str(), key)
    }

    /// Recovers the object key from a URL produced by [`Self::upload`].
    pub fn key_from_url<'a>(&self, bucket: Bucket, url: &'a str) -> Option<&'a str> {
        key_from_public_url(&self.public_url, bucket, url)
    }

    /// Like [`Self::key_from_url`], but only for objects uploaded by `owner_id`.
    pub fn owned_key_from_url<'a>(&self, bucket: Bucket, owner_id: Uuid, url: &'a str) -> Option<&'a str> {
        owned_key(&self.public_url, bucket, owner_id, url)
    }

    /// Rejects media URLs that were not uploaded by `owner_id` into `bucket`.
    pub fn ensure_owned_urls(&self, bucket: Bucket, owner_id: Uuid, urls: &[String]) -> Result<(), AppError> {
        foreign_urls(&self.public_url, bucket, owner_id, urls)
    }

    /// Generate a presigned URL for downloading
    pub async fn presigned_url(&self, bucket: Bucket, key: &str, expires_secs: u64) -> Result<String, AppError> {
        let presign_config = PresigningConfig::builder()
            .expires_in(Duration::from_secs(expires_secs))
            .build()
            .map_err(|e| AppError::internal(format!("presign config error: {e}")))?;

        let url = self.client
            .get_object()
            .bucket(bucket.as_str())
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| AppError::internal(format!("presign error: {e}")))?
            .uri()
            .to_string();

        Ok(url)
    }

    pub async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(bucket.as_str())
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("delete failed: {e}")))?;

        Ok(())
    }

    /// Removes `owner_id`'s objects by public URL, logging instead of failing.
    /// URLs pointing outside `{owner_id}/` in `bucket` are skipped.
    pub async fn delete_urls_best_effort(&self, bucket: Bucket, owner_id: Uuid, urls: &[String]) {
        for url in urls {
            let Some(key) = self.owned_key_from_url(bucket, owner_id, url) else {
                tracing::warn!(url = %url, bucket = bucket.as_str(), owner_id = %owner_id, "url is not an object of this owner, skipping");
                continue;
            };
            if let Err(e) = self.delete(bucket, key).await {
                tracing::warn!(error = %e, key = %key, bucket = bucket.as_str(), "failed to remove stored object");
            }
        }
    }
}

fn key_from_public_url<'a>(public_url: &str, bucket: Bucket, url: &'a str) -> Option<&'a str> {
    let rest = url.strip_prefix(public_url)?;
    let rest = rest.strip_prefix('/')?;
    let key = rest.strip_prefix(bucket.as_str())?.strip_prefix('/')?;
    (!key.is_empty()).then_some(key)
}

fn owned_key<'a>(public_url: &str, bucket: Bucket, owner_id: Uuid, url: &'a str) -> Option<&'a str> {
    let key = key_from_public_url(public_url, bucket, url)?;
    let owner = owner_id.to_string();
    let file = key.strip_prefix(owner.as_str())?.strip_prefix('/')?;
    let valid = !file.is_empty() && !file.contains('/') && !file.starts_with('.');
    valid.then_some(key)
}

fn foreign_urls(public_url: &str, bucket: Bucket, owner_id: Uuid, urls: &[String]) -> Result<(), AppError> {
    let foreign: Vec<&str> = urls
        .iter()
        .filter(|u| owned_key(public_url, bucket, owner_id, u).is_none())
        .map(String::as_str)
        .collect();
    if foreign.is_empty() {
        return Ok(());
    }
    Err(AppError::with_details(
        ErrorCode::ValidationError,
        format!("media must be uploaded to {} by the listing owner", bucket.as_str()),
        serde_json::json!({ "bucket": bucket.as_str(), "rejected": foreign }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_scoped_to_owner() {
        let owner = Uuid::now_v7();
        let key = object_key(owner, "png");
        assert!(key.starts_with(&format!("{owner}/")));
        assert!(key.ends_with(".png"));
        let file = key.rsplit('/').next().unwrap();
        let (ts, rest) = file.split_once('-').unwrap();
        assert!(ts.parse::<i64>().is_ok());
        assert_eq!(rest.len(), "abcdefgh.png".len());
    }

    #[test]
    fn only_known_image_types_are_accepted() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(document_extension("application/pdf"), Some("pdf"));
        assert_eq!(document_extension("text/html"), None);
    }

    #[test]
    fn key_is_recovered_from_public_url() {
        let base = "http://localhost:9000";
        let url = "http://localhost:9000/property-images/u1/1700000000000-abc.jpg";
        assert_eq!(
            key_from_public_url(base, Bucket::PropertyImages, url),
            Some("u1/1700000000000-abc.jpg")
        );
        assert_eq!(key_from_public_url(base, Bucket::Avatars, url), None);
        assert_eq!(key_from_public_url(base, Bucket::PropertyImages, "https://cdn.example.com/x.jpg"), None);
    }

    #[test]
    fn owned_key_rejects_other_owners() {
        let base = "http://localhost:9000";
        let owner = Uuid::now_v7();
        let victim = Uuid::now_v7();
        let mine = format!("{base}/property-images/{owner}/1700000000000-abcdefgh.jpg");
        let theirs = format!("{base}/property-images/{victim}/1700000000000-abcdefgh.jpg");

        assert_eq!(
            owned_key(base, Bucket::PropertyImages, owner, &mine),
            Some(format!("{owner}/1700000000000-abcdefgh.jpg").as_str())
        );
        assert_eq!(owned_key(base, Bucket::PropertyImages, owner, &theirs), None);
        assert_eq!(owned_key(base, Bucket::ProjectImages, owner, &mine), None);

        let nested = format!("{base}/property-images/{owner}/../{victim}/x.jpg");
        assert_eq!(owned_key(base, Bucket::PropertyImages, owner, &nested), None);
        let bare = format!("{base}/property-images/{owner}/");
        assert_eq!(owned_key(base, Bucket::PropertyImages, owner, &bare), None);
    }

    #[test]
    fn foreign_media_fails_validation() {
        let base = "http://localhost:9000";
        let owner = Uuid::now_v7();
        let victim = Uuid::now_v7();
        let mine = format!("{base}/project-plans/{owner}/1700000000000-aaaaaaaa.pdf");
        let theirs = format!("{base}/project-plans/{victim}/1700000000000-bbbbbbbb.pdf");

        assert!(foreign_urls(base, Bucket::ProjectPlans, owner, &[mine.clone()]).is_ok());
        assert!(foreign_urls(base, Bucket::ProjectPlans, owner, &[]).is_ok());

        let err = foreign_urls(base, Bucket::ProjectPlans, owner, &[mine, theirs]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let external = "https://cdn.example.com/x.pdf".to_string();
        assert!(foreign_urls(base, Bucket::ProjectPlans, owner, &[external]).is_err());
    }

    #[test]
    fn kyc_buckets_are_private() {
        assert!(Bucket::KycDocs.is_private());
        assert!(Bucket::LegalDocs.is_private());
        assert!(!Bucket::Avatars.is_private());
    }
}
