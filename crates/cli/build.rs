use std::{env, fs, path::PathBuf};

fn output_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        clap::arg!(-f --format <FORMAT> "Output format (json, jsonl)")
            .value_name("FORMAT")
            .default_value("json")
            .value_parser(["json", "jsonl", "ndjson"]),
    )
    .arg(
        clap::arg!(-o --output <FILE> "Output file (default: stdout)")
            .value_name("FILE")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
    )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let extract = clap::Command::new("extract")
        .about("Extract records from one or more pages")
        .arg(clap::arg!([INPUT] ... "URLs to fetch, local HTML files, or '-' for stdin (default: the test URLs of --site)"))
        .arg(clap::arg!(--source <NAME> "Source tag stamped on every record (overrides the site profile)"))
        .arg(
            clap::arg!(--"profile-dir" <DIR> "Custom site profile directory")
                .value_name("DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--site <NAME> "Use the named site profile instead of matching by domain"))
        .arg(clap::arg!(--reconcile "Merge duplicates across all inputs before printing"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA"));

    let reconcile = clap::Command::new("reconcile")
        .about("Merge duplicate records from JSON files")
        .arg(
            clap::arg!(<FILE> ... "JSON files, each holding an array of records")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        );

    let mut cmd = clap::Command::new("gleaner")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gleaner Contributors")
        .about("Extract listing records from web pages")
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(output_args(extract))
        .subcommand(output_args(reconcile));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "gleaner", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "gleaner", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "gleaner", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "gleaner", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
