use anyhow::{Context, Result};
use bader_batch::aggregate;
use bader_batch::arguments::{Action, Args, ClapApp};
use bader_batch::batch;
use bader_batch::progress::Bar;
use bader_batch::selector;
use log::LevelFilter;

fn main() -> Result<()> {
    let app = ClapApp::App;
    let args = Args::new(app.get().get_matches())?;

    let mut logger = env_logger::Builder::from_default_env();
    // RUST_LOG wins over -v and -q
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(args.verbosity);
    }
    logger.format_timestamp(None).format_target(false).init();

    match args.action {
        Action::Run(config) => {
            config.validate().context("Invalid configuration")?;
            let work_set = selector::select_units(&config.inputs, &config.pattern)
                .context("Failed to select units")?;
            let units = if config.skip_existing {
                selector::pending_units(&work_set, &config.result_dir)
            } else {
                work_set.into_iter().collect()
            };
            let pipeline = config.pipeline();
            let bar = Bar::new(units.len() as u64, 100, String::from("Units: "));
            if args.verbosity != LevelFilter::Error {
                bar.display();
            }
            let report =
                batch::run_batch(&pipeline, &units, config.workers(), &bar);
            drop(bar);
            let (path, table) = aggregate::aggregate(&config.result_dir)
                .context("Failed to aggregate the result records")?;
            println!("{} units processed, {} failed, {} rows in {}",
                     report.processed.len(),
                     report.failed.len(),
                     table.rows.len(),
                     path.display());
        }
        Action::Unit(config, id) => {
            config.validate().context("Invalid configuration")?;
            let path = config.pipeline()
                             .process_unit(&id)
                             .with_context(|| format!("Unit {} failed", id))?;
            println!("{}", path.display());
        }
        Action::Pending(config) => {
            let work_set = selector::select_units(&config.inputs, &config.pattern)
                .context("Failed to select units")?;
            for id in selector::pending_units(&work_set, &config.result_dir) {
                println!("{}", id);
            }
        }
        Action::Aggregate(result_dir) => {
            let (path, table) = aggregate::aggregate(&result_dir)
                .context("Failed to aggregate the result records")?;
            println!("{} rows in {}", table.rows.len(), path.display());
        }
    }
    Ok(())
}
