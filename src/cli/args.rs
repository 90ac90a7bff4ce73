use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Path to the placed design (TOML or JSON).
    pub design: PathBuf,

    /// Transform arguments: <max-cap-factor> <clone-largest-only>.
    pub args: Vec<String>,

    /// Path to TOML run configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to which the transformed design should be saved.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from(["gateclone", "top.toml", "2.0", "true", "-o", "out.toml"])
            .unwrap();
        assert_eq!(args.design, PathBuf::from("top.toml"));
        assert_eq!(args.args, vec!["2.0", "true"]);
        assert_eq!(args.output, Some(PathBuf::from("out.toml")));
        assert_eq!(args.config, None);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_design_is_required() {
        assert!(Args::try_parse_from(["gateclone"]).is_err());
    }
}
