// S3 client backed by rust-s3

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::debug;

use super::cursor::StoreCursor;
use super::{ListingPage, ObjectBody, ObjectMeta, ObjectStore};
use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub struct S3Store {
    bucket: Bucket,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        if config.s3_bucket_name.is_empty() {
            return Err(AppError::Internal(
                "S3_BUCKET_NAME must be set for the s3 storage provider".to_string(),
            ));
        }

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .s3_region
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid S3 region: {}", e)))?,
        };

        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to load AWS credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.s3_bucket_name, region, credentials)?;
        // MinIO, LocalStack and friends want path-style addressing
        if config.s3_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }
}

/// `head_object` with fail-on-err maps a missing key to a 404 failure.
fn is_missing(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

/// S3 sends ISO-8601 in listings and RFC 2822 in `Last-Modified` headers.
fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Storage(format!("Unparseable timestamp {:?}: {}", value, e)))
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self.bucket.head_object(key).await {
            Ok((_, 404)) => Ok(false),
            Ok(_) => Ok(true),
            Err(err) if is_missing(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn head(&self, key: &str) -> AppResult<ObjectMeta> {
        let (head, _) = self.bucket.head_object(key).await.map_err(|err| {
            if is_missing(&err) {
                AppError::NotFound(key.to_string())
            } else {
                err.into()
            }
        })?;

        let last_modified = match head.last_modified.as_deref() {
            Some(value) => parse_timestamp(value)?,
            None => Utc::now(),
        };

        Ok(ObjectMeta {
            key: key.to_string(),
            size: head.content_length.unwrap_or_default().max(0) as u64,
            last_modified,
            content_type: head.content_type,
        })
    }

    async fn get(&self, key: &str) -> AppResult<ObjectBody> {
        // the streaming response carries no headers, so take them from HEAD
        let meta = self.head(key).await?;
        let response = self.bucket.get_object_stream(key).await?;

        Ok(ObjectBody {
            meta,
            stream: response.bytes.map_err(AppError::from).boxed(),
        })
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        debug!(key, bytes = data.len(), content_type, "Putting object");
        self.bucket
            .put_object_with_content_type(key, &data, content_type)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.bucket.delete_object(key).await?;
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> AppResult<ListingPage> {
        let (prefix, native_token) = match continuation_token {
            Some(token) => {
                let cursor = StoreCursor::decode(token)?;
                (cursor.prefix, Some(cursor.position))
            }
            None => (prefix.map(str::to_owned), None),
        };

        let (result, _) = self
            .bucket
            .list_page(
                prefix.clone().unwrap_or_default(),
                None,
                native_token,
                None,
                Some(max_keys.min(self.native_page_size())),
            )
            .await?;

        let records = result
            .contents
            .into_iter()
            .map(|object| {
                Ok(ObjectMeta {
                    last_modified: parse_timestamp(&object.last_modified)?,
                    key: object.key,
                    size: object.size,
                    content_type: None,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let next_token = match result.next_continuation_token {
            Some(token) if result.is_truncated => {
                Some(StoreCursor::new(prefix.as_deref(), token).encode()?)
            }
            _ => None,
        };

        Ok(ListingPage {
            records,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_parse_listing_timestamp() {
        let ts = parse_timestamp("2009-10-12T17:50:30.000Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2009-10-12T17:50:30+00:00");
    }

    #[test]
    fn test_parse_header_timestamp() {
        let ts = parse_timestamp("Mon, 12 Oct 2009 17:50:00 GMT").unwrap();
        assert_eq!(ts.to_rfc3339(), "2009-10-12T17:50:00+00:00");
    }

    #[test]
    fn test_bad_timestamp_is_storage_error() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(AppError::Storage(_))
        ));
    }

    #[test]
    fn test_missing_bucket_name_is_rejected() {
        let config = StorageConfig {
            provider: "s3".to_string(),
            s3_bucket_name: String::new(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: Some("testing".to_string()),
            s3_secret_access_key: Some("testing".to_string()),
            s3_endpoint: None,
        };
        assert!(S3Store::new(&config).is_err());
    }

    fn mock_config(endpoint: &str) -> StorageConfig {
        StorageConfig {
            provider: "s3".to_string(),
            s3_bucket_name: "test-bucket".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: Some("testing".to_string()),
            s3_secret_access_key: Some("testing".to_string()),
            s3_endpoint: Some(endpoint.to_string()),
        }
    }

    fn list_xml(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|key| {
                format!(
                    "<Contents><Key>{}</Key><LastModified>2009-10-12T17:50:30.000Z</LastModified>\
                     <ETag>&quot;fba9dede5f27731c9771645a39863328&quot;</ETag><Size>12</Size>\
                     <StorageClass>STANDARD</StorageClass></Contents>",
                    key
                )
            })
            .collect();
        let truncation = match next_token {
            Some(token) => format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{}</NextContinuationToken>",
                token
            ),
            None => "<IsTruncated>false</IsTruncated>".to_string(),
        };

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Name>test-bucket</Name><Prefix>docs/</Prefix><KeyCount>{}</KeyCount>\
             <MaxKeys>2</MaxKeys>{}{}</ListBucketResult>",
            keys.len(),
            truncation,
            contents
        )
    }

    #[tokio::test]
    async fn test_list_page_wraps_native_token() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/test-bucket/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("list-type".into(), "2".into()),
                Matcher::UrlEncoded("prefix".into(), "docs/".into()),
                Matcher::UrlEncoded("max-keys".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(list_xml(&["docs/1.txt", "docs/2.txt"], Some("native-token-1")))
            .create_async()
            .await;

        let store = S3Store::new(&mock_config(&server.url())).unwrap();
        let page = store.list_page(Some("docs/"), 2, None).await.unwrap();
        first.assert_async().await;

        let keys: Vec<_> = page.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["docs/1.txt", "docs/2.txt"]);
        assert_eq!(page.records[0].size, 12);
        assert_eq!(
            page.records[0].last_modified.to_rfc3339(),
            "2009-10-12T17:50:30+00:00"
        );

        let cursor = StoreCursor::decode(page.next_token.as_deref().unwrap()).unwrap();
        assert_eq!(cursor.prefix.as_deref(), Some("docs/"));
        assert_eq!(cursor.position, "native-token-1");
    }

    #[tokio::test]
    async fn test_resumed_listing_restores_prefix() {
        let mut server = mockito::Server::new_async().await;
        let last = server
            .mock("GET", "/test-bucket/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("prefix".into(), "docs/".into()),
                Matcher::UrlEncoded("continuation-token".into(), "native-token-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(list_xml(&["docs/3.txt"], None))
            .create_async()
            .await;

        let store = S3Store::new(&mock_config(&server.url())).unwrap();
        let token = StoreCursor::new(Some("docs/"), "native-token-1").encode().unwrap();
        // the prefix argument is ignored once a token is supplied
        let page = store.list_page(None, 2, Some(&token)).await.unwrap();
        last.assert_async().await;

        let keys: Vec<_> = page.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["docs/3.txt"]);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_on_head() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/test-bucket/missing.txt")
            .with_status(404)
            .expect(2)
            .create_async()
            .await;

        let store = S3Store::new(&mock_config(&server.url())).unwrap();
        assert!(!store.exists("missing.txt").await.unwrap());
        assert!(matches!(
            store.head("missing.txt").await,
            Err(AppError::NotFound(key)) if key == "missing.txt"
        ));
    }

    #[tokio::test]
    async fn test_head_reads_object_headers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/test-bucket/some/file.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_header("last-modified", "Mon, 12 Oct 2009 17:50:00 GMT")
            .create_async()
            .await;

        let store = S3Store::new(&mock_config(&server.url())).unwrap();
        assert!(store.exists("some/file.txt").await.unwrap());

        let meta = store.head("some/file.txt").await.unwrap();
        assert_eq!(meta.key, "some/file.txt");
        assert_eq!(meta.content_type.as_deref(), Some("text/plain"));
        assert_eq!(meta.last_modified.to_rfc3339(), "2009-10-12T17:50:00+00:00");
    }

    #[tokio::test]
    async fn test_server_error_is_storage_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/test-bucket/")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("<Error><Code>NoSuchBucket</Code></Error>")
            .create_async()
            .await;

        let store = S3Store::new(&mock_config(&server.url())).unwrap();
        assert!(matches!(
            store.list_page(None, 10, None).await,
            Err(AppError::Storage(_))
        ));
    }

    #[test]
    fn test_custom_endpoint_builds_client() {
        let config = StorageConfig {
            provider: "s3".to_string(),
            s3_bucket_name: "test-bucket".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: Some("testing".to_string()),
            s3_secret_access_key: Some("testing".to_string()),
            s3_endpoint: Some("http://localhost:9000".to_string()),
        };
        let store = S3Store::new(&config).unwrap();
        assert_eq!(store.name(), "s3");
    }
}
