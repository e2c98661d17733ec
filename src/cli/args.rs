use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "catalogue-filter",
    version,
    about = "headless catalogue filter controller",
    long_about = "catalogue-filter drives a catalogue page's filter form without a browser: it binds the price and size range sliders, mirrors them into the form, and refreshes the listing fragment from the server on every change.\n\nExamples:\n  catalogue-filter -u http://127.0.0.1:5000 --price 10-40 -g Action -g RPG\n  catalogue-filter -u http://127.0.0.1:5000 --vars ./catalogue_vars.json -t \"half life\"\n  catalogue-filter --config ~/.catalogue-filter/config.yml --interactive\n\nTip: Use --config to persist server and bounds settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the final report to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        long = "fmt",
        visible_alias = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Report format: text, json or html (html is the raw listing fragment)."
    )]
    pub format: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "Server",
        help = "Base URL of the catalogue server."
    )]
    pub url: Option<String>,

    #[arg(
        long = "ep",
        visible_alias = "endpoint",
        value_name = "PATH",
        help_heading = "Server",
        help = "Listing endpoint path (defaults to /catalogue)."
    )]
    pub endpoint: Option<String>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Server",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'x',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "Server",
        help = "Route requests through a proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'H',
        long = "hd",
        visible_alias = "header",
        value_name = "HEADER",
        help_heading = "Server",
        help = "Extra request header ('Key: Value'), e.g. a session cookie."
    )]
    pub header: Option<String>,

    #[arg(
        long = "pol",
        visible_alias = "policy",
        value_name = "POLICY",
        help_heading = "Server",
        help = "Which responses may replace the listing: latest-issued (default, drops stale responses) or last-resolved (last to arrive wins, as the page script does)."
    )]
    pub policy: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.catalogue-filter/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a commented default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        long = "vars",
        value_name = "FILE",
        help_heading = "Input",
        help = "catalogueVars JSON (or the page's 'window.catalogueVars = {...}' script) with slider bounds."
    )]
    pub vars: Option<String>,

    #[arg(
        long = "genres",
        value_name = "LIST",
        help_heading = "Input",
        help = "Genre checkboxes the form offers (comma-separated)."
    )]
    pub genres: Option<String>,

    #[arg(
        long = "price",
        value_name = "MIN-MAX",
        help_heading = "Filters",
        help = "Drag the price slider to MIN-MAX."
    )]
    pub price: Option<String>,

    #[arg(
        long = "size",
        value_name = "MIN-MAX",
        help_heading = "Filters",
        help = "Drag the size slider to MIN-MAX."
    )]
    pub size: Option<String>,

    #[arg(
        short = 't',
        long = "title",
        value_name = "TEXT",
        help_heading = "Filters",
        help = "Type into the title search field."
    )]
    pub title: Option<String>,

    #[arg(
        short = 'g',
        long = "genre",
        value_name = "GENRE",
        action = ArgAction::Append,
        help_heading = "Filters",
        help = "Tick a genre checkbox (repeatable)."
    )]
    pub genre: Vec<String>,

    #[arg(
        short = 'I',
        long = "interactive",
        help_heading = "Session",
        help = "Read filter commands from stdin (type 'help' for the list)."
    )]
    pub interactive: bool,
}
