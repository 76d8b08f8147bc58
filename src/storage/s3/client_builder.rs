use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::{BehaviorVersion, ConfigLoader};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Builder;
use aws_types::SdkConfig;
use aws_types::region::Region;

use crate::config::{ClientConfig, S3Credentials};

impl ClientConfig {
    /// Builds a client bound to the given region. An explicitly configured
    /// region (single-endpoint test backends) takes precedence.
    pub async fn create_client(&self, region: &str) -> Client {
        let config_builder = Builder::from(&self.load_sdk_config(region).await)
            .force_path_style(self.force_path_style);

        Client::from_conf(config_builder.build())
    }

    async fn load_sdk_config(&self, region: &str) -> SdkConfig {
        let region = self.region.clone().unwrap_or_else(|| region.to_string());

        let mut config_loader = self
            .load_config_credential(aws_config::defaults(BehaviorVersion::latest()))
            .region(RegionProviderChain::first_try(Region::new(region)).or_default_provider())
            .retry_config(self.build_retry_config());

        if let Some(endpoint_url) = &self.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint_url);
        };

        config_loader.load().await
    }

    fn load_config_credential(&self, mut config_loader: ConfigLoader) -> ConfigLoader {
        match &self.credential {
            S3Credentials::Credentials {
                access_key,
                secret_access_key,
            } => {
                let credentials = aws_sdk_s3::config::Credentials::new(
                    access_key.to_string(),
                    secret_access_key.to_string(),
                    None,
                    None,
                    "",
                );
                config_loader = config_loader.credentials_provider(credentials);
            }
            S3Credentials::FromEnvironment => {}
        }
        config_loader
    }

    fn build_retry_config(&self) -> SdkRetryConfig {
        SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(std::time::Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }
}
