use clap::Parser;
use powdraw::draw::map_zones;
use powdraw::engine::candidate_digest;
use powdraw::{
    derive_draw, fingerprint_file, verify_candidate, Candidate, Difficulty, DrawConfig,
    DrawRecord, Error, HashAlgorithm, Registry,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Derive the lottery draw for a pool data file.
#[derive(Parser, Debug)]
#[command(name = "powdraw", version, about, long_about = None)]
struct Cli {
    /// Pool data file; its trimmed contents are fingerprinted.
    #[arg(default_value = "lottery_model.data")]
    file: PathBuf,

    /// Hex threshold; fewer leading non-zero digits means a longer search.
    #[arg(short, long)]
    difficulty: Option<Difficulty>,

    /// Number of accepted nonces to collect before picking the smallest.
    #[arg(short = 'n', long = "size")]
    pool_size: Option<usize>,

    /// Game to draw: double-color-ball or super-lotto.
    #[arg(short, long)]
    game: Option<String>,

    /// Hash algorithm: sha2-256, sha2-512, sha3-256 or blake3.
    #[arg(short, long)]
    algorithm: Option<HashAlgorithm>,

    /// Worker threads for the nonce scan.
    #[arg(short, long)]
    threads: Option<usize>,

    /// JSON file with draw parameters; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full draw record as JSON.
    #[arg(long)]
    json: bool,

    /// Skip the scan and check a published winning nonce instead.
    #[arg(long, value_name = "NONCE")]
    verify_nonce: Option<u64>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "powdraw=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(cli: &Cli) -> Result<DrawConfig, Error> {
    let mut config = match &cli.config {
        Some(path) => DrawConfig::load(path)?,
        None => DrawConfig::default(),
    };
    if let Some(difficulty) = &cli.difficulty {
        config.difficulty = difficulty.clone();
    }
    if let Some(pool_size) = cli.pool_size {
        config.pool_size = pool_size;
    }
    if let Some(game) = &cli.game {
        config.game = game.clone();
    }
    if let Some(algorithm) = cli.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = resolve_config(&cli)?;
    let zones = config.game(Registry::builtin())?.zones().to_vec();

    let fingerprint = fingerprint_file(&cli.file, config.algorithm)?;
    println!("file: {}", cli.file.display());
    println!("fingerprint: {fingerprint}");

    if let Some(nonce) = cli.verify_nonce {
        let winner = Candidate::new(
            candidate_digest(config.algorithm, &fingerprint, nonce),
            nonce,
        );
        verify_candidate(config.algorithm, &fingerprint, &config.difficulty, &winner)
            .map_err(|err| Error::InvalidConfig(format!("nonce {nonce} rejected: {err}")))?;
        let draw = map_zones(config.algorithm, &fingerprint, winner, &zones)?;
        println!("hash({:?}+{:?})", fingerprint.as_str(), nonce.to_string());
        println!("={:?}", draw.winner.digest);
        println!("draw: {draw}");
        return Ok(());
    }

    let engine = config.engine()?;
    let (pool, draw) = derive_draw(&fingerprint, &engine, &zones)?;
    if cli.json {
        let record = DrawRecord::new(fingerprint, &engine, config.game, zones, pool, draw);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| Error::unknown("serialising draw record", e))?;
        println!("{json}");
        return Ok(());
    }

    for candidate in pool.sorted() {
        println!("{candidate}");
    }
    println!("winning nonce = {}", draw.winner.nonce);
    println!("hash({:?}+{:?})", fingerprint.as_str(), draw.winner.nonce.to_string());
    println!("={:?}", draw.winner.digest);
    println!("draw: {draw}");
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::InputNotFound(path)) => {
            eprintln!("[error 2] file or path does not exist: {}", path.display());
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("[error -1] {err}");
            ExitCode::from(255)
        }
    }
}
