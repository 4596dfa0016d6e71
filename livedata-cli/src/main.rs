use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::Result;
use livedata::{
    load_data, AllowAll, ClassPropertyStore, DefaultConfigurationResolver, Document,
    DocumentStore, Error, HandlebarsRenderer, HtmlConverter, LiveDataConfiguration,
    LiveDataQuery, LiveTableConfiguration, LiveTableConfigurationResolver, LiveTableEntryStore,
    LiveTableRequestHandler, PathReferenceResolver, RequestContext, Settings,
};
use log::{debug, error, info};
use serde_json::Value;

#[derive(Parser, Debug)]
#[clap(name = "livedata", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Settings file. Defaults apply if it does not exist.
    #[clap(short, long, default_value = "livedata.yml")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a live table configuration into a live data configuration.
    Translate { path: PathBuf },
    /// Fill in the defaults of a live data configuration.
    Resolve { path: PathBuf },
    /// Show the live table request parameters of a live data query.
    Params { path: PathBuf },
    /// Run the query of a live data configuration against the templates.
    Query { path: PathBuf },
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })
    .map_err(|e| eyre::eyre!("failed to initialize logging: {}", e))?;

    match run(&args) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("Failed: {:?}", e);
            std::process::exit(1)
        }
    }
}

fn run(args: &Args) -> Result<Value> {
    let settings = Settings::load(&args.config)?;
    let translator = settings.load_translations()?;
    let classes = settings.load_classes()?;
    let property_store = ClassPropertyStore::new(&classes);
    let defaults = DefaultConfigurationResolver::new(&translator, &property_store)?;

    Ok(match &args.command {
        Command::Translate { path } => {
            let live_table: LiveTableConfiguration = load_data(path)?;
            let references = PathReferenceResolver::default();
            let resolver = LiveTableConfigurationResolver::new(&classes, &references, &defaults);
            serde_json::to_value(resolver.resolve(&live_table)?)?
        }
        Command::Resolve { path } => {
            let config: LiveDataConfiguration = load_data(path)?;
            serde_json::to_value(defaults.resolve(config)?)?
        }
        Command::Params { path } => {
            let query: LiveDataQuery = load_data(path)?;
            serde_json::to_value(LiveTableRequestHandler.parameters(&query))?
        }
        Command::Query { path } => execute_query(&settings, &defaults, path)?,
    })
}

fn execute_query(
    settings: &Settings,
    defaults: &DefaultConfigurationResolver,
    path: &Path,
) -> Result<Value> {
    let config: LiveDataConfiguration = load_data(path)?;
    let query = defaults.resolve(config)?.query.unwrap_or_default();

    let mut renderer = HandlebarsRenderer::new();
    let patterns = settings.template_patterns();
    let templates =
        renderer.load_templates(&patterns.iter().map(AsRef::as_ref).collect::<Vec<&str>>())?;
    debug!("Loaded templates: {:?}", templates);

    let store = LiveTableEntryStore::new(&AllowAll, &renderer, &ReadOnly, &ReadOnly)
        .with_default_template(settings.default_template.as_str())
        .with_html_conversion_key(settings.html_conversion_key.as_str());
    let live_data = store.get(&mut RequestContext::default(), &query)?;
    info!(
        "Got {} entries out of {}",
        live_data.entries.len(),
        live_data.count
    );
    Ok(serde_json::to_value(live_data)?)
}

/// The command line tool only reads entries.
struct ReadOnly;

impl DocumentStore for ReadOnly {
    fn load(&self, reference: &str) -> Result<Document, Error> {
        Ok(Document::new_unsaved(reference))
    }

    fn validate(&self, _: &Document) -> bool {
        false
    }

    fn save(&self, document: &Document, _: &str) -> Result<(), Error> {
        Err(Error::Storage(format!(
            "cannot save {}: documents are read-only",
            document.reference()
        )))
    }
}

impl HtmlConverter for ReadOnly {
    fn from_html(&self, _: &str, syntax: &str) -> Result<String, Error> {
        Err(Error::HtmlConversion(
            syntax.to_string(),
            "no HTML converter available".to_string(),
        ))
    }
}
