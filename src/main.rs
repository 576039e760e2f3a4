// Main CLI entry point for seedprobe
// Uses clap for argument parsing

use clap::{Arg, ArgAction, Command};
use seedprobe::auditor::{AuditOptions, Auditor, ModuleInfo};
use seedprobe::auth::{ApiKeyAuth, StaticTokenAuth};
use seedprobe::config::ScanConfig;
use seedprobe::elements::{ElementKind, Header, Page};
use seedprobe::engine::{AttackEngine, Transport};
use seedprobe::models::Request;
use seedprobe::mutator::Format;
use seedprobe::queue::DispatchQueue;
use seedprobe::reporting::{export_csv, export_json, export_markdown};
use seedprobe::session::ScanSession;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Parse a comma-separated list with the item's FromStr
fn parse_list<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<Vec<T>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// `HEADER:KEY` → ApiKeyAuth
fn parse_api_key(raw: &str) -> Result<ApiKeyAuth, String> {
    match raw.split_once(':') {
        Some((header, key)) if !header.trim().is_empty() && !key.trim().is_empty() => Ok(ApiKeyAuth {
            header: header.trim().to_string(),
            key: key.trim().to_string(),
        }),
        _ => Err(format!("Invalid --api-key '{}', expected HEADER:KEY", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_reads_formats_and_kinds() {
        let formats: Vec<Format> = parse_list("straight, null").unwrap();
        assert_eq!(formats, vec![Format::Straight, Format::Null]);

        let kinds: Vec<ElementKind> = parse_list("link,cookie,").unwrap();
        assert_eq!(kinds, vec![ElementKind::Link, ElementKind::Cookie]);

        assert!(parse_list::<Format>("straight,bogus").is_err());
    }

    #[test]
    fn parse_api_key_splits_header_and_key() {
        let auth = parse_api_key("X-Api-Key: secret").unwrap();
        assert_eq!(auth.header, "X-Api-Key");
        assert_eq!(auth.key, "secret");

        assert!(parse_api_key("no-separator").is_err());
        assert!(parse_api_key(":key").is_err());
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("seedprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Jake Abendroth")
        .about("Seed-injection audit engine for web application vulnerability scanners")
        .after_help("EXAMPLES:\n  seedprobe --url 'http://localhost:3000/item?id=1' --seed \"' OR 1=1\" --regexp '1=1'\n  seedprobe -u http://app/ -s '<xss>' --format straight --element form,link --no-train")
        .arg(Arg::new("url")
            .short('u')
            .long("url")
            .required(true)
            .num_args(1)
            .help("URL of the page to audit"))
        .arg(Arg::new("seed")
            .short('s')
            .long("seed")
            .required(true)
            .num_args(1)
            .help("Payload to inject into every element"))
        .arg(Arg::new("regexp")
            .long("regexp")
            .num_args(1)
            .conflicts_with("substring")
            .help("Regular expression that signals a finding"))
        .arg(Arg::new("substring")
            .long("substring")
            .num_args(1)
            .help("Exact substring that signals a finding (default: the seed)"))
        .arg(Arg::new("format")
            .long("format")
            .num_args(1)
            .default_value("straight,append,null,semicolon")
            .help("Comma-separated injection formats"))
        .arg(Arg::new("element")
            .long("element")
            .num_args(1)
            .default_value("link,form,cookie,header")
            .help("Comma-separated element kinds to audit"))
        .arg(Arg::new("header")
            .long("header")
            .num_args(1)
            .action(ArgAction::Append)
            .default_values(["User-Agent", "Referer"])
            .help("Request header to audit (repeatable)"))
        .arg(Arg::new("token")
            .long("token")
            .num_args(1)
            .help("Bearer token sent with every request"))
        .arg(Arg::new("api_key")
            .long("api-key")
            .num_args(1)
            .conflicts_with("token")
            .help("API key sent in a fixed header, as HEADER:KEY"))
        .arg(Arg::new("no_train")
            .long("no-train")
            .action(ArgAction::SetTrue)
            .help("Do not audit elements discovered in responses"))
        .arg(Arg::new("redundant")
            .long("redundant")
            .action(ArgAction::SetTrue)
            .help("Allow repeated audits of the same element and payload"))
        .arg(Arg::new("sync")
            .long("sync")
            .action(ArgAction::SetTrue)
            .help("Send one request at a time"))
        .arg(Arg::new("concurrency")
            .long("concurrency")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .default_value("20")
            .help("Maximum requests in flight"))
        .arg(Arg::new("timeout")
            .long("timeout")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .default_value("30")
            .help("Per-request timeout in seconds"))
        .arg(Arg::new("csv_report")
            .long("csv-report")
            .action(ArgAction::SetTrue)
            .help("Write a CSV report"))
        .arg(Arg::new("markdown_report")
            .long("markdown-report")
            .action(ArgAction::SetTrue)
            .help("Write a Markdown report"))
        .arg(Arg::new("json_report")
            .long("json-report")
            .action(ArgAction::SetTrue)
            .help("Write a JSON report"))
        .arg(Arg::new("out")
            .long("out")
            .num_args(1)
            .default_value(".")
            .help("Directory for reports"))
        .get_matches();

    let url = matches.get_one::<String>("url").expect("url is required");
    let seed = matches.get_one::<String>("seed").expect("seed is required");
    let out_dir = PathBuf::from(matches.get_one::<String>("out").expect("out has a default"));

    let formats: Vec<Format> = parse_list(matches.get_one::<String>("format").expect("format has a default"))
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(2);
        });
    let elements: Vec<ElementKind> = parse_list(matches.get_one::<String>("element").expect("element has a default"))
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(2);
        });

    let config = Arc::new(ScanConfig {
        timeout_secs: *matches.get_one::<u64>("timeout").expect("timeout has a default"),
        max_concurrency: *matches.get_one::<usize>("concurrency").expect("concurrency has a default"),
        ..ScanConfig::default()
    });

    let mut engine = AttackEngine::new(&config).unwrap_or_else(|e| {
        eprintln!("Failed to build HTTP client: {}", e);
        std::process::exit(1);
    });
    if let Some(token) = matches.get_one::<String>("token") {
        engine = engine.with_auth(StaticTokenAuth { token: token.clone() });
    }
    if let Some(raw) = matches.get_one::<String>("api_key") {
        let auth = parse_api_key(raw).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(2);
        });
        engine = engine.with_auth(auth);
    }
    let transport: Arc<dyn Transport> = Arc::new(engine);

    // Fetch and parse the target page
    let response = transport.send(Request::get(url.clone())).await.unwrap_or_else(|e| {
        eprintln!("Failed to fetch {}: {}", url, e);
        std::process::exit(1);
    });
    let mut page = Page::from_response(&response);
    if let Some(headers) = matches.get_many::<String>("header") {
        for name in headers {
            page = page.with_header(Header::new(name.clone(), String::new()));
        }
    }
    info!(
        "Loaded {}: {} link(s), {} form(s), {} cookie(s), {} header(s)",
        page.url,
        page.links.len(),
        page.forms.len(),
        page.cookies.len(),
        page.headers.len()
    );

    let session = Arc::new(ScanSession::new());
    let queue = DispatchQueue::new(Arc::clone(&transport), config.max_concurrency);
    let auditor = Auditor::new(
        ModuleInfo::new("cli", "Injected payload reflected"),
        page,
        Arc::clone(&session),
        queue,
        Arc::clone(&config),
    );

    let mut options = AuditOptions::default()
        .with_formats(&formats)
        .with_elements(&elements)
        .with_train(!matches.get_flag("no_train"))
        .with_redundant(matches.get_flag("redundant"))
        .with_async(!matches.get_flag("sync"));
    if let Some(regexp) = matches.get_one::<String>("regexp") {
        options = options.with_regexp(regexp.clone());
    }
    if let Some(substring) = matches.get_one::<String>("substring") {
        options = options.with_substring(substring.clone());
    }

    match auditor.audit(seed, options).await {
        Ok(dispatched) => info!("Dispatched {} audit unit(s)", dispatched),
        Err(e) => {
            error!("Audit aborted: {}", e);
            std::process::exit(2);
        }
    }
    tokio::select! {
        _ = auditor.run_all() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!(
                "Interrupted, abandoning {} outstanding request(s)",
                auditor.queue().outstanding()
            );
            auditor.queue().close();
        }
    }

    let issues = session.registry.results();
    println!("Found {} issue(s).", issues.len());
    for issue in &issues {
        println!(
            "[{}] {} {} {} input '{}': {:?}",
            issue.name, issue.method, issue.url, issue.elem, issue.id, issue.injected
        );
    }

    // Export results
    if matches.get_flag("csv_report") {
        report(export_csv(&issues, &out_dir));
    }
    if matches.get_flag("markdown_report") {
        report(export_markdown(&issues, &out_dir));
    }
    if matches.get_flag("json_report") {
        report(export_json(&issues, &out_dir));
    }
}

fn report(result: std::io::Result<PathBuf>) {
    match result {
        Ok(path) => println!("Report written to {}", path.display()),
        Err(e) => eprintln!("Failed to write report: {}", e),
    }
}
