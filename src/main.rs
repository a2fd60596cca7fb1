use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use studylog::{
    Config, Database, NewStudyInput, Profile, RecordFilter, RecordPatch, SettingsPatch, Store,
    cli::{self, Cli, Commands},
    utils,
};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let (config, created_config) = match cli.config {
        Some(ref path) => (Config::load_from_path(&PathBuf::from(path), profile)?, None),
        None => {
            let path = Config::get_config_path(profile)?;
            let (config, created) = Config::load_or_create(&path, profile)?;
            (config, created.then_some(path))
        }
    };

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = created_config {
        tracing::info!("Created default config at {}", path.display());
    }

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let mut store = Store::open(db);
    let today = utils::today();

    match cli.command.unwrap_or(Commands::Today) {
        Commands::Add { subject, resource, range, priority, date } => {
            let input = NewStudyInput::new(subject, resource, range)
                .with_priority(priority.unwrap_or(config.default_priority));
            cli::handle_add(input, date, &mut store, today)?;
        }
        Commands::Today => cli::handle_today(&store, today)?,
        Commands::List { status, subject, query } => {
            cli::handle_list(RecordFilter { status, subject, query }, &store)?;
        }
        Commands::Show { id } => cli::handle_show(&id, &store)?,
        Commands::Toggle { id } => cli::handle_toggle(&id, &mut store, today)?,
        Commands::Edit { id, subject, resource, range, priority, due } => {
            let patch = RecordPatch {
                subject,
                resource,
                range,
                priority,
                due_date: None,
            };
            cli::handle_edit(&id, patch, due, &mut store, today)?;
        }
        Commands::Delete { id } => cli::handle_delete(&id, &mut store, today)?,
        Commands::Calendar { month } => cli::handle_calendar(month, &store, today)?,
        Commands::Dashboard => cli::handle_dashboard(&store, today)?,
        Commands::Streak => cli::handle_streak(&store, today)?,
        Commands::Ranking => cli::handle_ranking(&store)?,
        Commands::Achievements => cli::handle_achievements(&store)?,
        Commands::Score { action } => cli::handle_score(action, &mut store, today)?,
        Commands::Settings { dark, theme } => {
            let patch = SettingsPatch {
                dark_mode: dark,
                theme_color: theme,
            };
            cli::handle_settings(patch, &mut store)?;
        }
        Commands::Export { path } => {
            cli::handle_export(path, &config.get_backup_directory(), &store, today)?;
        }
        Commands::Import { path } => cli::handle_import(&path, &mut store, today)?,
    }

    Ok(())
}
