//! `riffbook` - CLI for the guitar practice tracker
//!
//! This binary provides the command-line interface for managing practice
//! plans, logging daily progress, and reviewing statistics and reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::warn;

use riffbook::catalog::{self, INSTRUCTORS};
use riffbook::cli::{
    Cli, Command, ConfigCommand, ExportCommand, LogCommand, PlanCommand, ReportCommand, Selection,
    StatsCommand,
};
use riffbook::logger::{week_overview, ProgressLogger, SaveOutcome};
use riffbook::model::{parse_date, Plan};
use riffbook::plans::{self, find_plan, plan_techniques};
use riffbook::stats::{self, format_with_unit};
use riffbook::{export, init_logging, legacy, Config, Error, SqliteStore, Tracker, UserSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Configuration commands report load errors themselves
    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(cli.config, config_cmd),
        command => command,
    };

    let config = Config::load_from(cli.config).context("failed to load configuration")?;

    let result = match command {
        Command::Catalog(catalog_cmd) => handle_catalog(catalog_cmd.json),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        command => handle_tracked(&config, command).await,
    };

    // Notices are not failures
    match result {
        Err(e) => match e.downcast_ref::<Error>() {
            Some(err) if err.is_notice() => {
                println!("{err}");
                Ok(())
            }
            _ => Err(e),
        },
        Ok(()) => Ok(()),
    }
}

/// Run a command that needs the user's live document.
async fn handle_tracked(config: &Config, command: Command) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(config)?);
    let session = UserSession::from_config(config)?;
    let mut tracker = Tracker::open(store, session).await?;

    match command {
        Command::Plan(plan_cmd) => handle_plan(&mut tracker, plan_cmd).await,
        Command::Log(log_cmd) => handle_log(&mut tracker, log_cmd).await,
        Command::Stats(stats_cmd) => handle_stats(&tracker, &stats_cmd),
        Command::Export(ExportCommand::Csv { out }) => handle_export(config, &tracker, out),
        Command::Report(report_cmd) => handle_report(&tracker, &report_cmd),
        Command::Import(import_cmd) => {
            let summary = legacy::import_file(&mut tracker, &import_cmd.file).await?;
            println!(
                "Imported {} plans and {} entries ({} values).",
                summary.plans, summary.entries, summary.values
            );
            if summary.skipped_entries > 0 || summary.skipped_values > 0 {
                println!(
                    "Skipped {} entries and {} non-numeric values.",
                    summary.skipped_entries, summary.skipped_values
                );
            }
            if summary.skipped_techniques > 0 {
                println!(
                    "Dropped {} repeated technique ids from plans.",
                    summary.skipped_techniques
                );
            }
            Ok(())
        }
        Command::Watch => handle_watch(&mut tracker).await,
        Command::Catalog(_) | Command::Status(_) | Command::Config(_) => Ok(()),
    }
}

fn handle_catalog(json: bool) -> anyhow::Result<()> {
    if json {
        let catalog = serde_json::json!({
            "instructors": INSTRUCTORS,
            "techniques": catalog::TECHNIQUES,
        });
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for instructor in INSTRUCTORS {
        println!("{}", instructor.name);
        println!("  {}", instructor.bio);
        for tech in catalog::techniques_for(instructor.id) {
            println!();
            println!("  {} [{}]", tech.name, tech.id);
            println!("    {}", tech.description);
            for metric in tech.default_metrics {
                if metric.unit.is_empty() {
                    println!("    - {}: {}", metric.id, metric.label);
                } else {
                    println!("    - {}: {} ({})", metric.id, metric.label, metric.unit);
                }
            }
        }
        println!();
    }
    Ok(())
}

async fn handle_plan(tracker: &mut Tracker, cmd: PlanCommand) -> anyhow::Result<()> {
    match cmd {
        PlanCommand::List { json } => {
            let plans = &tracker.data().plans;
            if json {
                println!("{}", serde_json::to_string_pretty(plans)?);
            } else if plans.is_empty() {
                println!("No plans yet. Create one with `riffbook plan create`.");
            } else {
                for plan in plans {
                    println!(
                        "{:<40} {} ({} techniques)",
                        plan.id,
                        plan.plan_name,
                        plan.technique_ids.len()
                    );
                }
            }
        }
        PlanCommand::Show { plan } => {
            let plan = find_plan(tracker.data(), &plan)?;
            println!("{}", plan.plan_name);
            println!("  id: {}", plan.id);
            for tech in plan_techniques(plan) {
                let metrics: Vec<_> = tech.default_metrics.iter().map(|m| m.label).collect();
                println!("  - {} [{}]: {}", tech.name, tech.id, metrics.join(", "));
            }
        }
        PlanCommand::Create { name, techniques } => {
            let mut plan = Plan::draft();
            if let Some(name) = name {
                plan.rename(name);
            }
            for technique in &techniques {
                require_technique(technique)?;
                plan.add_technique(technique);
            }
            let summary = format!("Created plan {} ({})", plan.plan_name, plan.id);
            plans::save_plan(tracker, plan).await?;
            println!("{summary}");
        }
        PlanCommand::Rename { plan, name } => {
            let mut plan = find_plan(tracker.data(), &plan)?.clone();
            plan.rename(name);
            let summary = format!("Renamed plan {} to {}", plan.id, plan.plan_name);
            plans::save_plan(tracker, plan).await?;
            println!("{summary}");
        }
        PlanCommand::Add { plan, technique } => {
            require_technique(&technique)?;
            let mut plan = find_plan(tracker.data(), &plan)?.clone();
            if plan.add_technique(&technique) {
                let summary = format!("Added {technique} to {}", plan.plan_name);
                plans::save_plan(tracker, plan).await?;
                println!("{summary}");
            } else {
                println!("{} already includes {technique}", plan.plan_name);
            }
        }
        PlanCommand::Remove { plan, technique } => {
            let mut plan = find_plan(tracker.data(), &plan)?.clone();
            if plan.remove_technique(&technique) {
                let summary = format!("Removed {technique} from {}", plan.plan_name);
                plans::save_plan(tracker, plan).await?;
                println!("{summary}");
            } else {
                println!("{} does not include {technique}", plan.plan_name);
            }
        }
        PlanCommand::Delete { plan, yes } => {
            let plan = find_plan(tracker.data(), &plan)?.clone();
            let entries = tracker
                .data()
                .progress
                .iter()
                .filter(|e| e.plan_id == plan.id)
                .count();
            if yes {
                plans::delete_plan(tracker, &plan.id).await?;
                println!("Deleted plan {} and {entries} progress entries.", plan.plan_name);
            } else {
                println!(
                    "This will delete plan {} and all {entries} associated progress entries.",
                    plan.plan_name
                );
                println!("Use --yes to confirm.");
            }
        }
    }
    Ok(())
}

fn require_technique(technique: &str) -> riffbook::Result<()> {
    catalog::technique(technique)
        .map(|_| ())
        .ok_or_else(|| Error::UnknownTechnique {
            technique: technique.to_string(),
        })
}

/// Resolve a selection to the plan and date it names.
fn select(tracker: &Tracker, selection: &Selection) -> riffbook::Result<(Plan, NaiveDate)> {
    let plan = find_plan(tracker.data(), &selection.plan)?.clone();
    let date = match &selection.date {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };
    Ok((plan, date))
}

async fn handle_log(tracker: &mut Tracker, cmd: LogCommand) -> anyhow::Result<()> {
    match cmd {
        LogCommand::Show { selection } => {
            let (plan, date) = select(tracker, &selection)?;
            let logger = ProgressLogger::select(tracker.data(), &plan, date);
            println!("{} on {date}", plan.plan_name);
            for (tech_id, metrics) in logger.fields() {
                let tech = catalog::technique(tech_id);
                println!("  {}", tech.map_or(tech_id.as_str(), |t| t.name));
                for (metric_id, raw) in metrics {
                    let label = tech
                        .and_then(|t| t.metric(metric_id))
                        .map_or(metric_id.as_str(), |m| m.label);
                    let shown = if raw.is_empty() { "-" } else { raw.as_str() };
                    println!("    {label:<28} {shown}");
                }
            }
        }
        LogCommand::Set { selection, values } => {
            let (plan, date) = select(tracker, &selection)?;
            let mut logger = ProgressLogger::select(tracker.data(), &plan, date);
            for value in values {
                if catalog::metric(&value.technique, &value.metric).is_none() {
                    warn!(
                        technique = %value.technique,
                        metric = %value.metric,
                        "Metric is not in the catalog"
                    );
                }
                logger.handle_metric_change(&value.technique, &value.metric, value.raw);
            }
            report_save(&plan, date, logger.save(tracker).await?)?;
        }
        LogCommand::Clear { selection } => {
            let (plan, date) = select(tracker, &selection)?;
            let mut logger = ProgressLogger::select(tracker.data(), &plan, date);
            let keys: Vec<(String, String)> = logger
                .fields()
                .iter()
                .flat_map(|(t, metrics)| metrics.keys().map(move |m| (t.clone(), m.clone())))
                .collect();
            for (tech, metric) in keys {
                logger.handle_metric_change(&tech, &metric, "");
            }
            report_save(&plan, date, logger.save(tracker).await?)?;
        }
        LogCommand::Week { selection } => {
            let (plan, date) = select(tracker, &selection)?;
            println!("{} - week of {date}", plan.plan_name);
            for day in week_overview(tracker.data(), &plan.id, date) {
                let status = match day.logged_values {
                    0 => "-".to_string(),
                    1 => "logged (1 value)".to_string(),
                    n => format!("logged ({n} values)"),
                };
                let marker = if day.date == date { '>' } else { ' ' };
                println!("{marker} {} {}  {status}", day.date.format("%a"), day.date);
            }
        }
    }
    Ok(())
}

fn report_save(plan: &Plan, date: NaiveDate, outcome: SaveOutcome) -> riffbook::Result<()> {
    match outcome {
        SaveOutcome::Saved => println!("Saved progress for {} on {date}.", plan.plan_name),
        SaveOutcome::Cleared => println!("Cleared progress for {} on {date}.", plan.plan_name),
        SaveOutcome::NothingToSave => return Err(Error::NoDataToSave),
    }
    Ok(())
}

fn handle_stats(tracker: &Tracker, cmd: &StatsCommand) -> anyhow::Result<()> {
    let summary = stats::summarize(&tracker.data().progress, &cmd.technique, &cmd.metric)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} - {}", summary.technique_name, summary.metric_label);
    println!(
        "  All-time best:  {}",
        format_with_unit(summary.best, &summary.unit)
    );
    match summary.latest {
        Some(point) => println!(
            "  Latest:         {} ({})",
            format_with_unit(point.value, &summary.unit),
            point.date
        ),
        None => println!("  Latest:         -"),
    }
    println!("  Week over week: {}", summary.week_over_week);
    if !summary.series.is_empty() {
        println!();
        for point in &summary.series {
            println!(
                "  {}  {}",
                point.date,
                format_with_unit(point.value, &summary.unit)
            );
        }
    }
    Ok(())
}

fn handle_export(config: &Config, tracker: &Tracker, out: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = out.unwrap_or_else(|| config.export_dir());
    let path = export::write_csv(
        &dir,
        tracker.session().export_label(),
        Utc::now().date_naive(),
        tracker.data(),
    )?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn handle_report(tracker: &Tracker, cmd: &ReportCommand) -> anyhow::Result<()> {
    match cmd {
        ReportCommand::Table => print!("{}", export::to_printable_table(tracker.data())?.render()),
        ReportCommand::Graphs => {
            print!("{}", export::to_printable_graph_set(tracker.data())?.render());
        }
    }
    Ok(())
}

async fn handle_watch(tracker: &mut Tracker) -> anyhow::Result<()> {
    println!("Watching for changes (Ctrl-C to stop)...");
    print_snapshot(tracker);
    loop {
        tokio::select! {
            open = tracker.next_snapshot() => {
                if !open {
                    break;
                }
                print_snapshot(tracker);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_snapshot(tracker: &Tracker) {
    let data = tracker.data();
    println!(
        "[{}] {} plans, {} progress entries",
        Utc::now().format("%H:%M:%S"),
        data.plans.len(),
        data.progress.len()
    );
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = SqliteStore::open(config)?;
    let stats = store.stats(&config.user.id)?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "app_id": store.app_id(),
            "user_id": config.user.id,
            "revision": stats.revision,
            "plans": stats.plan_count,
            "entries": stats.entry_count,
            "last_updated": stats.last_updated,
            "documents": stats.document_count,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("riffbook status");
        println!("---------------");
        println!("Database:      {}", config.database_path().display());
        println!("App id:        {}", store.app_id());
        println!("User:          {}", config.user.id);
        println!("Revision:      {}", stats.revision);
        println!("Plans:         {}", stats.plan_count);
        println!("Entries:       {}", stats.entry_count);
        match stats.last_updated {
            Some(at) => println!("Last updated:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Last updated:  never"),
        }
        println!("Documents:     {}", stats.document_count);
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  App id:             {}", config.storage.app_id);
                println!("  Poll interval (ms): {}", config.storage.poll_interval_ms);
                println!();
                println!("[User]");
                println!("  Id:                 {}", config.user.id);
                println!("  Email:              {}", config.user.email);
                println!();
                println!("[Export]");
                println!("  Directory:          {}", config.export_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
