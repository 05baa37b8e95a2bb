use anyhow::Result;
use clap::{Parser, Subcommand};
use indexer::{build, corpus_map, evaluate_benchmark, load_benchmark, load_corpus, open_engine, resolve_method};
use search_core::config::DEFAULT_TOP_N;
use search_core::NormalizerOptions;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and evaluate a product catalog search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long, env = "CATALOG_INDEX_DIR")]
        output: PathBuf,
        /// Drop single-character tokens
        #[arg(long, default_value_t = false)]
        drop_short_tokens: bool,
    },
    /// Rank the corpus against one query
    Search {
        #[arg(long, env = "CATALOG_INDEX_DIR")]
        index: PathBuf,
        /// Corpus the index was built from (ratings and prices)
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long, short)]
        query: String,
        /// tfidf, bm25, custom, blended or embedding
        #[arg(long, default_value = "tfidf")]
        method: String,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
        /// Word vectors in word2vec text format
        #[arg(long, env = "CATALOG_EMBEDDINGS")]
        embeddings: Option<PathBuf>,
        #[arg(long)]
        target_rating: Option<f64>,
        #[arg(long)]
        target_price: Option<f64>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Score rankings against a benchmark of relevant pids
    Evaluate {
        #[arg(long, env = "CATALOG_INDEX_DIR")]
        index: PathBuf,
        #[arg(long)]
        corpus: PathBuf,
        /// JSON array of {"query", "relevant"}
        #[arg(long)]
        benchmark: PathBuf,
        #[arg(long, default_value = "tfidf")]
        method: String,
        /// Cutoff for P@K, R@K, F1@K and AP@K
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
        #[arg(long, env = "CATALOG_EMBEDDINGS")]
        embeddings: Option<PathBuf>,
        /// Rating target for the blended method
        #[arg(long)]
        target_rating: Option<f64>,
        /// Price target for the blended method
        #[arg(long)]
        target_price: Option<f64>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, drop_short_tokens } => {
            let meta = build(&input, &output, NormalizerOptions { drop_short_tokens })?;
            println!("indexed {} documents, {} terms", meta.num_docs, meta.num_terms);
        }
        Commands::Search { index, corpus, query, method, top_n, embeddings, target_rating, target_price, json } => {
            let corpus = corpus_map(&load_corpus(&corpus)?);
            let engine = open_engine(&index, &corpus, embeddings.as_deref())?;
            let method = resolve_method(&method, target_rating, target_price)?;
            let hits = engine.search_hits(&query, &corpus, method, top_n);
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                println!("Query: {query} ({method})");
                for hit in hits {
                    println!("  {} | {:.4} | {}", hit.pid, hit.score, hit.title);
                }
            }
        }
        Commands::Evaluate {
            index,
            corpus,
            benchmark,
            method,
            k,
            top_n,
            embeddings,
            target_rating,
            target_price,
            json,
        } => {
            let corpus = corpus_map(&load_corpus(&corpus)?);
            let engine = open_engine(&index, &corpus, embeddings.as_deref())?;
            let queries = load_benchmark(&benchmark)?;
            let method = resolve_method(&method, target_rating, target_price)?;
            let report = evaluate_benchmark(&engine, &corpus, &queries, method, top_n, k);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{:<40} {:>7} {:>7} {:>7} {:>7} {:>7}", "query", "P@K", "R@K", "F1@K", "AP@K", "NDCG");
                for q in &report.queries {
                    println!(
                        "{:<40} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>7.4}",
                        q.query, q.precision, q.recall, q.f1, q.average_precision, q.ndcg
                    );
                }
                println!("MAP {:.4}  MRR {:.4}  (K = {})", report.map, report.mrr, report.k);
            }
        }
    }
    Ok(())
}
