//! Command handlers
//!
//! Thin glue between the parsed command line and the library: load and
//! validate configuration, build the registry aggregator, run the converter,
//! and format the report. Handlers return the process exit code — 0 on
//! completion (per-declaration skips and per-document errors included), 1 on
//! infrastructure failure such as an unloadable configuration.

use std::fs;

use regex::Regex;
use tracing::{error, info};

use super::commands::{ConvertArgs, SourcesArgs};
use super::output::{OutputFormatter, SourceStatus};
use crate::config::PackrefConfig;
use crate::convert::{Converter, MatchRules};
use crate::project::discover_projects;
use crate::registry::RegistryAggregator;

pub async fn handle_convert(args: &ConvertArgs) -> i32 {
    let config = match PackrefConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return 1;
        }
    };
    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        return 1;
    }

    let name_pattern = match &args.reference_pattern {
        Some(pattern) => match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                error!(pattern = %pattern, error = %err, "invalid reference pattern");
                return 1;
            }
        },
        None => None,
    };

    let properties = match PackrefConfig::parse_properties(&args.properties) {
        Ok(properties) => properties,
        Err(err) => {
            error!(error = %err, "invalid --property argument");
            return 1;
        }
    };

    let projects = discover_projects(&args.projects);
    if projects.is_empty() {
        info!("no project files found, nothing to do");
        return 0;
    }

    let aggregator = match RegistryAggregator::from_config(&config) {
        Ok(aggregator) => aggregator,
        Err(err) => {
            error!(error = %err, "failed to initialize package registries");
            return 1;
        }
    };

    let rules = MatchRules {
        include_without_hint_path: args.include_without_hint_path,
        name_pattern,
    };
    let converter = Converter::new(aggregator, rules, args.include_prerelease, properties);
    let summary = converter.run(&projects).await;

    let formatter = OutputFormatter::new(args.format.into());
    let report = match formatter.format_summary(&summary) {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "failed to format report");
            return 1;
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(err) = fs::write(path, &report) {
                error!(path = %path.display(), error = %err, "failed to write report");
                return 1;
            }
        }
        None => println!("{}", report),
    }
    0
}

pub async fn handle_sources(args: &SourcesArgs) -> i32 {
    let config = match PackrefConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return 1;
        }
    };
    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        return 1;
    }

    let statuses: Vec<SourceStatus> = if args.check {
        let aggregator = match RegistryAggregator::from_config(&config) {
            Ok(aggregator) => aggregator,
            Err(err) => {
                error!(error = %err, "failed to initialize package registries");
                return 1;
            }
        };

        let mut statuses = Vec::with_capacity(config.sources.len());
        for (source, registry) in config.sources.iter().zip(aggregator.registries()) {
            let status = match registry.probe().await {
                Ok(()) => SourceStatus::reachable(source),
                Err(err) => SourceStatus::unreachable(source, err.to_string()),
            };
            statuses.push(status);
        }
        statuses
    } else {
        config.sources.iter().map(SourceStatus::unchecked).collect()
    };

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_sources(&statuses) {
        Ok(report) => {
            println!("{}", report);
            0
        }
        Err(err) => {
            error!(error = %err, "failed to format source list");
            1
        }
    }
}
