//! mediagate CLI: check media files against placement requirements.
//!
//! Commands:
//!   mediagate check <file> --placement <id> [--media <id>]   Validate against a catalog placement
//!   mediagate check <file> --requirements <json-file>        Validate against an inline set
//!   mediagate probe <file> [--probe <backend>]               Print extracted metadata as JSON
//!   mediagate sniff <file>                                   Print the detected file type
//!
//! Exit status: 0 all requirements met, 1 some requirement failed, 2 error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mediagate_core::effects::build_extractor;
use mediagate_core::effects::sniff::{read_head, MagicSniffer, HEAD_LEN};
use mediagate_core::settings::ENV_CATALOG;
use mediagate_core::{
    requirement_set_from_json, Locale, MetadataExtractor, PlacementRef, RequirementSet,
    SignatureSniffer, Settings, Upload, ValidationError, ValidationReport, Validator,
};

const EXIT_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return ExitCode::from(EXIT_ERROR);
    }

    let settings = Settings::from_env();

    match args[0].as_str() {
        "check" => cmd_check(settings, &args[1..]),
        "probe" => cmd_probe(settings, &args[1..]),
        "sniff" => cmd_sniff(&args[1..]),
        "help" | "-h" | "--help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("unknown command: {}", other);
            print_usage();
            ExitCode::from(EXIT_ERROR)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct CheckArgs {
    file: PathBuf,
    placement: Option<String>,
    media: Option<u32>,
    requirements: Option<PathBuf>,
    json: bool,
}

fn cmd_check(settings: Settings, args: &[String]) -> ExitCode {
    let (settings, check) = match parse_check(settings, args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: mediagate check <file> (--placement <id> [--media <id>] | --requirements <json-file>)");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match run_check(&settings, &check) {
        Ok(report) => {
            if check.json {
                print_json(&report);
            } else {
                print_report(&report);
            }
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILED)
            }
        }
        Err(e) => {
            print_error(&e, settings.locale);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run_check(settings: &Settings, check: &CheckArgs) -> Result<ValidationReport, ValidationError> {
    log::debug!(
        "mediagate: checking {} ({} probing, {} policy)",
        check.file.display(),
        settings.probe,
        settings.policy
    );
    let upload = Upload::from_path(&check.file)?;
    let buffer = read_head(&check.file, HEAD_LEN)?;
    let validator = Validator::from_settings(settings);

    if let Some(path) = &check.requirements {
        let requirements = load_requirements(path)?;
        return validator.check(&upload, &buffer, &requirements);
    }

    let placement = check.placement.as_deref().unwrap_or_default();
    let catalog = settings.load_catalog()?.ok_or_else(|| {
        ValidationError::Catalog(format!("no catalog given (--catalog or {})", ENV_CATALOG))
    })?;
    let mut target = PlacementRef::new(placement);
    if let Some(media) = check.media {
        target = target.with_media(media);
    }
    validator.check_placement(&upload, &buffer, &target, &catalog)
}

fn cmd_probe(mut settings: Settings, args: &[String]) -> ExitCode {
    let mut file = None;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--probe" => match take_value(&mut it, arg).and_then(|v| v.parse()) {
                Ok(backend) => settings.probe = backend,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::from(EXIT_ERROR);
                }
            },
            other => file = Some(PathBuf::from(other)),
        }
    }
    let Some(file) = file else {
        eprintln!("usage: mediagate probe <file> [--probe <ffprobe|native|auto>]");
        return ExitCode::from(EXIT_ERROR);
    };

    let extractor = build_extractor(settings.probe, &settings.ffprobe);
    match extractor.probe(&file) {
        Ok(metadata) => {
            print_json(&metadata);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("probe failed: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn cmd_sniff(args: &[String]) -> ExitCode {
    let Some(file) = args.first() else {
        eprintln!("usage: mediagate sniff <file>");
        return ExitCode::from(EXIT_ERROR);
    };

    let buffer = match read_head(Path::new(file), HEAD_LEN) {
        Ok(buffer) => buffer,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match MagicSniffer::new().sniff(&buffer) {
        Some(signature) => {
            println!("{}  (.{})", signature.mime_type, signature.extension);
            ExitCode::SUCCESS
        }
        None => {
            println!("unknown");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

fn take_value<'a>(it: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String, String> {
    it.next()
        .cloned()
        .ok_or_else(|| format!("{} needs a value", flag))
}

fn parse_check(mut settings: Settings, args: &[String]) -> Result<(Settings, CheckArgs), String> {
    let mut file = None;
    let mut placement = None;
    let mut media = None;
    let mut requirements = None;
    let mut json = false;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--placement" => placement = Some(take_value(&mut it, arg)?),
            "--media" => {
                let raw = take_value(&mut it, arg)?;
                media = Some(raw.parse::<u32>().map_err(|_| format!("invalid media id: {}", raw))?);
            }
            "--requirements" => requirements = Some(PathBuf::from(take_value(&mut it, arg)?)),
            "--catalog" => settings.catalog = Some(PathBuf::from(take_value(&mut it, arg)?)),
            "--probe" => settings.probe = take_value(&mut it, arg)?.parse()?,
            "--locale" => settings.locale = take_value(&mut it, arg)?.parse()?,
            "--policy" => settings.policy = take_value(&mut it, arg)?.parse()?,
            "--json" => json = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
            path if file.is_none() => file = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument: {}", extra)),
        }
    }

    let file = file.ok_or("missing <file>")?;
    match (&placement, &requirements) {
        (None, None) => return Err("one of --placement or --requirements is required".into()),
        (Some(_), Some(_)) => return Err("--placement and --requirements are exclusive".into()),
        _ => {}
    }

    Ok((
        settings,
        CheckArgs {
            file,
            placement,
            media,
            requirements,
            json,
        },
    ))
}

fn load_requirements(path: &Path) -> Result<RequirementSet, ValidationError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ValidationError::Catalog(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| ValidationError::Catalog(e.to_string()))?;
    requirement_set_from_json(&value)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &ValidationReport) {
    if report.is_empty() {
        println!("no requirements evaluated");
        return;
    }
    for result in &report.results {
        println!(
            "{}  {:<24} {}",
            if result.status { "PASS" } else { "FAIL" },
            result.title,
            result.value
        );
        for allowed in &result.allowed {
            println!("      {:<24} {}", "", allowed);
        }
    }
    let failed = report.failures().count();
    println!();
    println!("{} of {} requirements met", report.len() - failed, report.len());
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("could not encode output: {}", e),
    }
}

fn print_error(e: &ValidationError, locale: Locale) {
    eprintln!("error: {}", e.user_message(locale));
    let mut cause: Option<&dyn std::error::Error> = Some(e);
    while let Some(err) = cause {
        eprintln!("  {}", err);
        cause = err.source();
    }
}

fn print_usage() {
    eprintln!("mediagate: media requirement validation");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  check <file> --placement <id> [--media <id>]   Validate against a catalog placement");
    eprintln!("  check <file> --requirements <json-file>        Validate against an inline set");
    eprintln!("  probe <file> [--probe <backend>]               Print extracted metadata as JSON");
    eprintln!("  sniff <file>                                   Print the detected file type");
    eprintln!();
    eprintln!("Options for check:");
    eprintln!("  --catalog <path>        Requirement catalog (default ${})", ENV_CATALOG);
    eprintln!("  --probe <backend>       ffprobe | native | auto");
    eprintln!("  --locale <en|es>        Language of titles and messages");
    eprintln!("  --policy <policy>       propagate | empty (unreadable files)");
    eprintln!("  --json                  Print the report as JSON");
    eprintln!();
    eprintln!("Exit status: 0 all met, 1 some failed, 2 error. RUST_LOG enables logging.");
}
