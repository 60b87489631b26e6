use clap::{Parser, Subcommand};
use page_agent::DEFAULT_SETTINGS_FILE;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-agent")]
#[command(about = "Snapshot live web pages, ask a generation service about them, and run its scripts")]
#[command(version)]
pub struct Args {
    /// Agent configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Generation settings file (JSON), re-read on every request
    #[arg(short, long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// WebDriver URL; WEBDRIVER_URL still takes precedence
    #[arg(short, long, global = true)]
    pub webdriver: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a page and chat about it
    Chat {
        /// Page to open
        url: String,
    },

    /// Print a page snapshot as JSON
    Snapshot {
        /// Page to open in the browser
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,

        /// Read an HTML file instead of driving a browser
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// URL used to resolve relative links in --file
        #[arg(long, requires = "file")]
        base_url: Option<String>,
    },

    /// List the generation models the API key can use
    Models {
        /// Store this model in the settings file
        #[arg(long = "use", value_name = "MODEL")]
        select: Option<String>,
    },
}
