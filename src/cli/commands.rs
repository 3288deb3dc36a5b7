use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Convert assembly references in MSBuild projects to NuGet package references
#[derive(Parser, Debug)]
#[command(
    name = "packref",
    about = "Convert assembly references in MSBuild projects to NuGet package references",
    version,
    author,
    long_about = "packref scans MSBuild project files for <Reference> items that point at \
                  compiled .dll files, searches the configured NuGet feeds for a package \
                  with a matching name, and rewrites each match into a <PackageReference> \
                  with the feed's current version."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose logging (debug level)")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error logging"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Convert assembly references to package references",
        long_about = "Finds <Reference> items with a .dll hint path, searches the configured \
                      feeds in order, and replaces each match with a <PackageReference>.\n\n\
                      Examples:\n  \
                      packref convert\n  \
                      packref convert '^Newtonsoft\\.'\n  \
                      packref convert --projects src/App --include-prerelease\n  \
                      packref convert --include-without-hint-path --format json"
    )]
    Convert(ConvertArgs),

    #[command(
        about = "List the configured package sources",
        long_about = "Lists the configured NuGet feeds in priority order.\n\n\
                      Examples:\n  \
                      packref sources\n  \
                      packref sources --check"
    )]
    Sources(SourcesArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(
        value_name = "PATTERN",
        help = "Only convert references whose name matches this regex"
    )]
    pub reference_pattern: Option<String>,

    #[arg(
        short = 'P',
        long = "projects",
        value_name = "PATH",
        help = "Project files or directories to scan (defaults to the current directory)"
    )]
    pub projects: Vec<PathBuf>,

    #[arg(long, help = "Consider prerelease package versions")]
    pub include_prerelease: bool,

    #[arg(
        long,
        help = "Also convert references that carry no .dll hint path"
    )]
    pub include_without_hint_path: bool,

    #[arg(
        short = 'p',
        long = "property",
        value_name = "KEY=VALUE",
        help = "Global MSBuild property, expanded into $(KEY) occurrences"
    )]
    pub properties: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the report to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct SourcesArgs {
    #[arg(long, help = "Probe each source's service index for reachability")]
    pub check: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn default_convert_args() {
        let args = CliArgs::parse_from(["packref", "convert"]);
        match args.command {
            Commands::Convert(convert_args) => {
                assert!(convert_args.reference_pattern.is_none());
                assert!(convert_args.projects.is_empty());
                assert!(!convert_args.include_prerelease);
                assert!(!convert_args.include_without_hint_path);
                assert!(convert_args.properties.is_empty());
                assert_eq!(convert_args.format, OutputFormatArg::Human);
                assert!(convert_args.output.is_none());
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn convert_with_pattern_and_flags() {
        let args = CliArgs::parse_from([
            "packref",
            "convert",
            "^System\\.",
            "--projects",
            "src/App",
            "--projects",
            "src/Lib/Lib.csproj",
            "--include-prerelease",
            "--include-without-hint-path",
            "--property",
            "Configuration=Release",
            "--format",
            "json",
        ]);

        match args.command {
            Commands::Convert(convert_args) => {
                assert_eq!(convert_args.reference_pattern.as_deref(), Some("^System\\."));
                assert_eq!(
                    convert_args.projects,
                    vec![PathBuf::from("src/App"), PathBuf::from("src/Lib/Lib.csproj")]
                );
                assert!(convert_args.include_prerelease);
                assert!(convert_args.include_without_hint_path);
                assert_eq!(convert_args.properties, vec!["Configuration=Release"]);
                assert_eq!(convert_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn sources_command() {
        let args = CliArgs::parse_from(["packref", "sources"]);
        match args.command {
            Commands::Sources(sources_args) => {
                assert!(!sources_args.check);
                assert_eq!(sources_args.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Sources command"),
        }
    }

    #[test]
    fn sources_with_check() {
        let args = CliArgs::parse_from(["packref", "sources", "--check", "--format", "yaml"]);
        match args.command {
            Commands::Sources(sources_args) => {
                assert!(sources_args.check);
                assert_eq!(sources_args.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Sources command"),
        }
    }

    #[test]
    fn global_verbose_flag() {
        let args = CliArgs::parse_from(["packref", "-v", "convert"]);
        assert!(args.verbose);
        assert!(!args.quiet);
    }

    #[test]
    fn global_quiet_flag() {
        let args = CliArgs::parse_from(["packref", "-q", "convert"]);
        assert!(!args.verbose);
        assert!(args.quiet);
    }

    #[test]
    fn log_level_flag() {
        let args = CliArgs::parse_from(["packref", "--log-level", "debug", "convert"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
