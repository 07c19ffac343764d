use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Build and ship visual-reasoning task datasets", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download a hub dataset and write it as `{domain}_task/{task_id}/`
    /// directories.
    Download {
        /// Registered dataset adapter, e.g. `videothinkbench`.
        #[clap(long)]
        dataset: String,

        /// Dataset split to read.
        #[clap(long, default_value = "test")]
        split: String,

        /// Output root for task directories.
        #[clap(long, default_value = "data/questions")]
        output: PathBuf,

        /// Stop after this many records.
        #[clap(long)]
        limit: Option<usize>,

        /// Hub repository to read instead of the adapter's default.
        #[clap(long)]
        repo: Option<String>,

        /// Also write `question_metadata.json` per task.
        #[clap(long)]
        metadata: bool,
    },

    /// Upload a local dataset tree to S3 or download a prefix from it.
    Transfer {
        #[clap(long, value_enum)]
        action: Action,

        /// Local root to upload (required for `upload`).
        #[clap(long)]
        input: Option<PathBuf>,

        /// Local root to download into (required for `download`).
        #[clap(long)]
        output: Option<PathBuf>,

        #[clap(long, env = "FRAMEKIT_BUCKET")]
        bucket: String,

        /// Key prefix; a trailing `/` is added when missing.
        #[clap(long, default_value = "")]
        prefix: String,
    },

    /// Check every task directory under a dataset root.
    Validate {
        #[clap(long, default_value = "data/questions")]
        root: PathBuf,
    },
}

#[derive(ValueEnum, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Upload,
    Download,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_defaults() {
        let args = Args::parse_from(["framekit", "download", "--dataset", "videothinkbench"]);
        assert_eq!(
            args.cmd,
            Command::Download {
                dataset: "videothinkbench".into(),
                split: "test".into(),
                output: PathBuf::from("data/questions"),
                limit: None,
                repo: None,
                metadata: false,
            }
        );
    }

    #[test]
    fn transfer_parses_action() {
        let args = Args::parse_from([
            "framekit", "transfer", "--action", "upload", "--input", "data/questions",
            "--bucket", "datasets", "--prefix", "runs/v1",
        ]);
        match args.cmd {
            Command::Transfer { action, input, output, bucket, prefix } => {
                assert_eq!(action, Action::Upload);
                assert_eq!(action.to_string(), "upload");
                assert_eq!(input, Some(PathBuf::from("data/questions")));
                assert_eq!(output, None);
                assert_eq!(bucket, "datasets");
                assert_eq!(prefix, "runs/v1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let parsed = Args::try_parse_from([
            "framekit", "transfer", "--action", "sync", "--bucket", "b",
        ]);
        assert!(parsed.is_err());
    }
}
