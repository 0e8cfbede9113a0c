use clap::{ArgAction, Parser};

const HELP_TEMPLATE: &'static str = r#"
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
"#;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None, disable_help_flag=true, help_template=HELP_TEMPLATE)]
pub struct Cli {
    /// Literal "continue" resumes an existing run from its checkpoints
    /// instead of starting fresh; any other value (or no argument) runs
    /// the configuration as given.
    #[arg(value_name = "continue")]
    pub mode: Option<String>,

    /// Overrides SIMCORE_LOG for this run's env_logger filter.
    #[arg(long = "log", value_name = "FILTER")]
    pub log_filter: Option<String>,

    #[arg(long, help="Print help information", action=ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    /// Whether the positional argument was the literal word `continue`.
    pub fn resume(&self) -> bool {
        self.mode.as_deref() == Some("continue")
    }
}
