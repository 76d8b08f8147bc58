#[cfg(test)]
#[cfg(feature = "e2e_test")]
mod common;

#[cfg(test)]
#[cfg(feature = "e2e_test")]
mod tests {
    use std::path::Path;

    use cossync_e2e::scenario::command::SyncCommand;

    use super::*;
    use common::*;

    #[tokio::test]
    async fn help_shows_examples() {
        TestHelper::init_dummy_tracing_subscriber();

        let command = SyncCommand::new(TestHelper::sync_command_from_env());
        let output = command.help().await.unwrap();

        assert_eq!(output.status, Some(0));
        assert!(output.stderr.is_empty());
        assert!(output.stdout.contains("Examples:"));
    }

    #[tokio::test]
    async fn rejects_missing_spec_file_flag() {
        TestHelper::init_dummy_tracing_subscriber();

        let command = SyncCommand::new(TestHelper::sync_command_from_env());
        let output = command.run(Vec::<String>::new()).await.unwrap();

        assert!(!output.success());
        assert!(output.stderr.contains(r#""spec-file" not set"#));
    }

    #[tokio::test]
    async fn rejects_nonexistent_spec_file() {
        TestHelper::init_dummy_tracing_subscriber();

        let command = SyncCommand::new(TestHelper::sync_command_from_env());
        let output = command
            .sync_with_spec_file(Path::new("fake-spec-file.json"))
            .await
            .unwrap();

        assert!(!output.success());
        assert!(output.stderr.contains("no such file or directory"));
    }
}
