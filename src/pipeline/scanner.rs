use std::collections::HashSet;

use anyhow::Result;
use regex::Regex;
use tracing::{error, info, trace, warn};

use crate::config::ScanBackoffConfig;
use crate::storage::Storage;
use crate::types::error::HarnessError;

/// Checks that every expected object name is present in a bucket listing.
///
/// The backoff config bounds how many listing passes are made before the
/// first missing name is reported; backends with replication lag get a
/// retry-with-exponential-backoff window instead of an immediate failure.
pub struct VerificationScanner {
    storage: Storage,
    backoff: ScanBackoffConfig,
}

impl VerificationScanner {
    pub fn new(storage: Storage, backoff: ScanBackoffConfig) -> Self {
        Self { storage, backoff }
    }

    /// Succeeds only if every expected name is found. Short-circuits on the
    /// first name still missing after the configured attempts, naming the
    /// file and the bucket.
    pub async fn verify(
        &self,
        bucket: &str,
        filter: Option<&Regex>,
        expected: &[String],
    ) -> Result<()> {
        info!(bucket = bucket, "verify objects in bucket.");

        let mut delay = self.backoff.initial_backoff;
        for attempt in 1..=self.backoff.max_attempts {
            let listed: HashSet<String> = self
                .storage
                .list_objects(bucket, filter)
                .await?
                .into_iter()
                .collect();

            let Some(missing) = find_first_missing(&listed, expected) else {
                trace!(
                    bucket = bucket,
                    attempt = attempt,
                    "all expected objects are present."
                );
                return Ok(());
            };

            if attempt == self.backoff.max_attempts {
                error!(
                    bucket = bucket,
                    key = missing,
                    "object not found in the bucket."
                );
                return Err(HarnessError::ObjectMissing {
                    bucket: bucket.to_string(),
                    key: missing.to_string(),
                }
                .into());
            }

            warn!(
                bucket = bucket,
                key = missing,
                attempt = attempt,
                "object not yet visible. retrying."
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Ok(())
    }
}

fn find_first_missing<'a>(listed: &HashSet<String>, expected: &'a [String]) -> Option<&'a str> {
    expected
        .iter()
        .find(|name| !listed.contains(*name))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::storage::StorageTrait;
    use crate::storage::memory::InMemoryStorage;

    use super::*;

    fn expected_names() -> Vec<String> {
        vec!["data1".to_string(), "data2".to_string(), "data3".to_string()]
    }

    async fn seeded_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage
            .create_bucket("bucket1", "us-east-standard")
            .await
            .unwrap();
        for name in expected_names() {
            storage.insert_object("bucket1", &name);
        }
        storage
    }

    fn fast_backoff(max_attempts: u32) -> ScanBackoffConfig {
        ScanBackoffConfig {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn verify_complete_listing() {
        init_dummy_tracing_subscriber();

        let storage = seeded_storage().await;
        let scanner = VerificationScanner::new(Box::new(storage), ScanBackoffConfig::default());

        scanner
            .verify("bucket1", None, &expected_names())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_nothing_expected() {
        init_dummy_tracing_subscriber();

        let storage = seeded_storage().await;
        let scanner = VerificationScanner::new(Box::new(storage), ScanBackoffConfig::default());

        scanner.verify("bucket1", None, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn verify_missing_object_names_file_and_bucket() {
        init_dummy_tracing_subscriber();

        let storage = seeded_storage().await;
        storage.remove_object("bucket1", "data2");

        let scanner =
            VerificationScanner::new(Box::new(storage), ScanBackoffConfig::default());
        let error = scanner
            .verify("bucket1", None, &expected_names())
            .await
            .unwrap_err();

        match error.downcast_ref::<HarnessError>().unwrap() {
            HarnessError::ObjectMissing { bucket, key } => {
                assert_eq!(bucket, "bucket1");
                assert_eq!(key, "data2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn verify_respects_filter() {
        init_dummy_tracing_subscriber();

        let storage = seeded_storage().await;
        storage.insert_object("bucket1", "unrelated.dat");

        let scanner = VerificationScanner::new(Box::new(storage), ScanBackoffConfig::default());
        let filter = Regex::new(r"^data\d$").unwrap();

        scanner
            .verify("bucket1", Some(&filter), &expected_names())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_retries_until_visible() {
        init_dummy_tracing_subscriber();

        let storage = seeded_storage().await;
        storage.defer_visibility("bucket1", "data3", 2);

        let scanner = VerificationScanner::new(Box::new(storage), fast_backoff(3));
        scanner
            .verify("bucket1", None, &expected_names())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_single_pass_fails_on_lag() {
        init_dummy_tracing_subscriber();

        let storage = seeded_storage().await;
        storage.defer_visibility("bucket1", "data3", 2);

        let scanner = VerificationScanner::new(Box::new(storage), fast_backoff(1));
        let error = scanner
            .verify("bucket1", None, &expected_names())
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<HarnessError>().unwrap(),
            HarnessError::ObjectMissing { .. }
        ));
    }

    #[test]
    fn find_first_missing_short_circuits() {
        init_dummy_tracing_subscriber();

        let listed: HashSet<String> = ["data1".to_string()].into_iter().collect();
        let expected = vec![
            "data1".to_string(),
            "data2".to_string(),
            "data3".to_string(),
        ];

        assert_eq!(find_first_missing(&listed, &expected), Some("data2"));
        assert_eq!(find_first_missing(&listed, &expected[..1]), None);
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
