use clap::builder::NonEmptyStringValueParser;
use clap::{value_parser, Arg, Command, ValueHint};
use resolver_cli::input::Input;
use resolver_cli::runner::Runner;

fn path_arg(name: &'static str, hint: ValueHint, help: &'static str) -> Arg {
    Arg::new(name)
        .value_parser(NonEmptyStringValueParser::new())
        .value_hint(hint)
        .help(help)
}

fn command() -> Command {
    Command::new("resolver")
        .version(clap::crate_version!())
        .author("Michael Lazear <michaellazear92@gmail.com>")
        .about("Protein inference by partitioning the protein/peptide graph")
        .arg(
            path_arg(
                "parameters",
                ValueHint::FilePath,
                "Path to configuration parameters (JSON file)",
            )
            .required(true),
        )
        .arg(
            path_arg(
                "identification_paths",
                ValueHint::FilePath,
                "Identification files (JSON) to resolve. Replaces the files listed in the \
                 configuration file.",
            )
            .num_args(1..),
        )
        .arg(
            path_arg(
                "fasta",
                ValueHint::FilePath,
                "Protein database to digest. Replaces the FASTA file listed in the \
                 configuration file.",
            )
            .short('f')
            .long("fasta"),
        )
        .arg(
            path_arg(
                "output_directory",
                ValueHint::DirPath,
                "Directory for the result tables. Replaces the directory listed in the \
                 configuration file.",
            )
            .short('o')
            .long("output_directory"),
        )
        .arg(
            path_arg(
                "design",
                ValueHint::FilePath,
                "Experimental design. Identification files mapped to the same \
                 experimental setting are merged and resolved together.",
            )
            .short('d')
            .long("design"),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of batches to load and resolve in parallel (default = # of CPUs/2)")
                .value_hint(ValueHint::Other),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("RESOLVER_LOG", "error,resolver=info"))
        .init();

    let matches = command().get_matches();

    let parallel = matches
        .get_one::<u16>("batch-size")
        .copied()
        .unwrap_or_else(|| (num_cpus::get() as u16 / 2).max(1)) as usize;

    let runner = Input::from_arguments(matches)
        .and_then(Input::build)
        .and_then(Runner::new)?;
    runner.run(parallel)?;

    Ok(())
}
