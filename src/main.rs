//! doxyedit CLI - edit doxyfiles and run doxygen on them

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use doxyedit::{
    find_doxyfiles, properties, Alignment, BuildJob, Doxyfile, JobListener, JobRegistry,
    LineSeparator, ListMode, Location, Outcome, Preferences, Result,
};

#[derive(Parser)]
#[command(name = "doxyedit")]
#[command(about = "Edit doxyfiles and run doxygen on them")]
#[command(version)]
struct Cli {
    /// Preferences file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the settings of a doxyfile
    Show {
        file: PathBuf,

        /// List settings by group
        #[arg(short, long)]
        groups: bool,
    },

    /// Print the value of a setting
    Get { file: PathBuf, identifier: String },

    /// Change a setting and write the file back
    Set {
        file: PathBuf,
        identifier: String,
        value: String,

        /// Add the setting even if the file does not have it yet
        #[arg(short, long)]
        add: bool,
    },

    /// Re-write a doxyfile with the given layout
    Format {
        file: PathBuf,

        /// do-not-change, single-line or continued
        #[arg(short, long)]
        list_mode: Option<ListMode>,

        /// system, lf, cr or crlf
        #[arg(short = 's', long)]
        line_separator: Option<LineSeparator>,

        /// compact, fixed or fixed:WIDTH
        #[arg(short, long)]
        align: Option<Alignment>,

        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// Run doxygen on a doxyfile
    Build {
        file: PathBuf,

        /// Doxygen executable
        #[arg(long)]
        doxygen: Option<PathBuf>,

        /// Print the markers as JSON
        #[arg(long)]
        json: bool,
    },

    /// List doxyfiles matching patterns or below directories
    Find {
        #[arg(required = true)]
        patterns: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Preferences::load(cli.config.as_deref()).and_then(|prefs| run(cli.command, prefs));
    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("doxyedit: {}", e);
            process::exit(2);
        }
    }
}

fn load(file: &Path, prefs: &Preferences) -> Result<Doxyfile> {
    let mut doxyfile = Doxyfile::new(Location::File(file.to_path_buf())).with_defaults(prefs.defaults()?);
    doxyfile.load()?;
    Ok(doxyfile)
}

fn run(command: Commands, prefs: Preferences) -> Result<i32> {
    match command {
        Commands::Show { file, groups } => run_show(&file, groups, &prefs),
        Commands::Get { file, identifier } => {
            let doxyfile = load(&file, &prefs)?;
            match doxyfile.setting(&identifier) {
                Some(setting) => {
                    println!("{}", setting.value());
                    Ok(0)
                }
                None => {
                    eprintln!("{}: no setting {}", file.display(), identifier);
                    Ok(1)
                }
            }
        }
        Commands::Set { file, identifier, value, add } => {
            let mut doxyfile = load(&file, &prefs)?;
            if doxyfile.contains(&identifier) {
                doxyfile.set_value(&identifier, value)?;
            } else if add {
                doxyfile.add_setting(&identifier, value);
            } else {
                eprintln!("{}: no setting {} (use --add)", file.display(), identifier);
                return Ok(1);
            }
            doxyfile.save(&prefs.serializer(doxyfile.line_separator()))?;
            Ok(0)
        }
        Commands::Format { file, list_mode, line_separator, align, write } => {
            let mut doxyfile = load(&file, &prefs)?;
            let mut serializer = prefs.serializer(doxyfile.line_separator());
            if let Some(m) = list_mode {
                serializer = serializer.list_mode(m);
            }
            if let Some(s) = line_separator {
                serializer = serializer.separator(s);
            }
            if let Some(a) = align {
                serializer = serializer.alignment(a);
            }
            if write {
                doxyfile.save(&serializer)?;
            } else {
                serializer.write_to(&doxyfile, io::stdout().lock())?;
            }
            Ok(0)
        }
        Commands::Build { file, doxygen, json } => {
            let mut prefs = prefs;
            if doxygen.is_some() {
                prefs.doxygen = doxygen;
            }
            run_build(&file, json, &prefs)
        }
        Commands::Find { patterns } => {
            for path in find_doxyfiles(&patterns)? {
                println!("{}", path.display());
            }
            Ok(0)
        }
    }
}

fn run_show(file: &Path, groups: bool, prefs: &Preferences) -> Result<i32> {
    let doxyfile = load(file, prefs)?;
    if !groups {
        for setting in doxyfile.settings() {
            println!("{} {} {}", setting.identifier(), setting.operator(), setting.value());
        }
        return Ok(0);
    }
    for group in doxyfile.groups() {
        println!("[{}]", group.name());
        for identifier in group.identifiers() {
            let value = doxyfile.setting(identifier).map(|s| s.value()).unwrap_or("");
            match doxyfile.property(identifier, properties::TEXT) {
                Some(text) => println!("  {} ({}) = {}", identifier, text, value),
                None => println!("  {} = {}", identifier, value),
            }
        }
    }
    Ok(0)
}

// Echo the log as it comes in.
struct Echo;

impl JobListener for Echo {
    fn log_appended(&self, _job: &BuildJob, text: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

fn run_build(file: &Path, json: bool, prefs: &Preferences) -> Result<i32> {
    let doxyfile = load(file, prefs)?;
    let job = JobRegistry::global().get_or_create(&doxyfile, prefs.build_command()?);
    if !json {
        job.add_listener(Arc::new(Echo));
    }
    let outcome = job.run()?;
    let markers = job.markers();
    if json {
        println!("{}", serde_json::to_string_pretty(&markers)?);
    } else {
        for marker in &markers {
            eprintln!("{}", marker);
        }
    }
    Ok(match outcome {
        Outcome::Ok => 0,
        Outcome::Failed(_) => 1,
        Outcome::Cancelled => 130,
    })
}
