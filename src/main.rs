use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use minisearch::{CompressMethod, Config, Error, ErrorKind, Result, Session};

/// N-gram full-text search over a single embedded database file.
#[derive(Debug, Parser)]
#[command(name = "minisearch", version)]
struct Args {
    /// Database file
    db_path: PathBuf,

    /// JSONL corpus to ingest; one {"title": ..., "body": ...} per line
    #[arg(short = 'x', long = "corpus")]
    corpus: Option<PathBuf>,

    /// Query to run against the index
    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    /// Posting-list compression: none or golomb
    #[arg(short = 'c', long = "compress", default_value = "golomb")]
    compress: String,

    /// Stop ingesting after this many documents
    #[arg(short = 'm', long = "max-docs")]
    max_docs: Option<u32>,

    /// Flush the index buffer once it holds more documents than this
    #[arg(short = 't', long = "threshold", default_value_t = 2048)]
    threshold: u32,

    /// Don't use token positions for search (disables phrase matching)
    #[arg(short = 's', long = "no-phrase")]
    no_phrase: bool,
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("minisearch: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.corpus.is_some() && args.db_path.exists() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("{} already exists", args.db_path.display()),
        ));
    }

    let compress = CompressMethod::parse(&args.compress).unwrap_or_else(|| {
        eprintln!(
            "invalid compress method {:?}, using golomb instead",
            args.compress
        );
        CompressMethod::Golomb
    });
    let config = Config {
        compress,
        flush_threshold: args.threshold,
        phrase_search: !args.no_phrase,
        ..Config::default()
    };
    let mut session = Session::open(&args.db_path, config)?;

    if let Some(corpus) = &args.corpus {
        let started = Instant::now();
        session.begin()?;
        let loaded = minisearch::corpus::load_corpus(corpus, args.max_docs, |title, body| {
            session.add_document(title, body)?;
            eprintln!("count:{} title: {}", session.indexed_count(), title);
            Ok(())
        });
        let loaded = match loaded {
            Ok(count) => session.commit().map(|_| count),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(loaded) => eprintln!(
                "indexed {} documents in {:.3}s",
                loaded,
                started.elapsed().as_secs_f64()
            ),
            Err(e) => {
                session.rollback()?;
                return Err(e);
            }
        }
    }

    if let Some(query) = &args.query {
        let started = Instant::now();
        let results = session.search(query)?;
        for hit in &results.hits {
            let title = session.document_title(hit.document_id)?.unwrap_or_default();
            println!(
                "document_id: {} title: {} score: {:.6}",
                hit.document_id.value(),
                title,
                hit.score
            );
        }
        println!("Total {} documents are found!", results.len());
        eprintln!("searched in {:.3}s", started.elapsed().as_secs_f64());
    }

    Ok(())
}
