use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use docqa_core::config::{resolve_with_base, Settings};
use docqa_core::metric::WhitespaceMetric;
use docqa_core::parser::ParserRegistry;
use docqa_core::{Embedder, LengthMetric, StructureAwareChunker};
use docqa_embed::{get_default_embedder, TokenizerMetric};
use docqa_hybrid::{FusedHit, HybridRetriever, Ingestor, OpenAiChatModel, RagPipeline};
use docqa_text::SparseIndex;
use docqa_vector::InMemoryDenseIndex;

type Retriever = HybridRetriever<InMemoryDenseIndex<Box<dyn Embedder>>>;

const USAGE: &str = "Usage: docqa <command> [args...]

Commands:
  ingest <file|dir>... [--doc-id ID]   parse, chunk and index documents
  search <query> [--k N] [--doc ID]    hybrid search, prints fused hits
  ask <question> [--k N] [--doc ID]    answer from retrieved context
  delete <doc_id>                      remove a document from the dense index";

struct Args {
    positional: Vec<String>,
    k: Option<usize>,
    doc: Option<String>,
    doc_id: Option<String>,
    json: bool,
}

fn parse_args(raw: &[String]) -> anyhow::Result<Args> {
    let mut args = Args { positional: Vec::new(), k: None, doc: None, doc_id: None, json: false };
    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "--k" | "-k" => {
                let v = raw.get(i + 1).context("--k requires a number")?;
                args.k = Some(v.parse().with_context(|| format!("--k requires a number, got '{v}'"))?);
                i += 1;
            }
            "--doc" => {
                args.doc = Some(raw.get(i + 1).context("--doc requires a document id")?.clone());
                i += 1;
            }
            "--doc-id" => {
                args.doc_id = Some(raw.get(i + 1).context("--doc-id requires a value")?.clone());
                i += 1;
            }
            "--json" => args.json = true,
            other if other.starts_with('-') => bail!("unknown flag {other}"),
            other => args.positional.push(other.to_string()),
        }
        i += 1;
    }
    Ok(args)
}

struct Paths {
    bm25: PathBuf,
    dense: PathBuf,
}

fn paths(settings: &Settings) -> anyhow::Result<Paths> {
    let base = env::current_dir()?;
    Ok(Paths {
        bm25: resolve_with_base(&base, &settings.data.bm25_index_path),
        dense: resolve_with_base(&base, &settings.data.dense_index_path),
    })
}

fn length_metric(settings: &Settings) -> anyhow::Result<Arc<dyn LengthMetric>> {
    match &settings.data.tokenizer_path {
        Some(p) => Ok(Arc::new(TokenizerMetric::from_file(&resolve_with_base(&env::current_dir()?, p))?)),
        None => Ok(Arc::new(WhitespaceMetric)),
    }
}

fn open_retriever(settings: &Settings, paths: &Paths) -> anyhow::Result<Retriever> {
    let embedder = get_default_embedder(&settings.embedding)?;
    let sparse = SparseIndex::load(&paths.bm25)?;
    let dense = InMemoryDenseIndex::load(&paths.dense, embedder)?;
    Ok(HybridRetriever::new(sparse, dense, settings.retrieval.clone()))
}

fn save_retriever(retriever: &Retriever, paths: &Paths) -> anyhow::Result<()> {
    retriever.sparse().save(&paths.bm25)?;
    retriever.dense().save(&paths.dense)?;
    Ok(())
}

/// Expand directories into the supported files beneath them, sorted.
fn collect_files(inputs: &[String], parsers: &ParserRegistry) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && parsers.supports(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.to_path_buf());
        }
    }
    files
}

fn ingest(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    if args.positional.is_empty() {
        bail!("ingest needs at least one file or directory\n\n{USAGE}");
    }
    let paths = paths(settings)?;
    let mut retriever = open_retriever(settings, &paths)?;
    let chunker = StructureAwareChunker::new(length_metric(settings)?, settings.chunking.clone());
    let ingestor = Ingestor::new(ParserRegistry::with_defaults(), chunker);

    let files = collect_files(&args.positional, ingestor.parsers());
    if args.doc_id.is_some() && files.len() != 1 {
        bail!("--doc-id applies to exactly one file, got {}", files.len());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let batch = ingestor.ingest_files(&files, args.doc_id.as_deref(), &mut retriever, |file| {
        pb.set_message(file.display().to_string());
        pb.inc(1);
    });
    pb.finish_with_message("done");

    save_retriever(&retriever, &paths)?;
    println!("✅ Ingested {}/{} documents ({} chunks)", batch.reports.len(), files.len(), batch.chunks());
    if !batch.failures.is_empty() {
        for failure in &batch.failures {
            eprintln!("❌ {}: {:#}", failure.path.display(), failure.error);
        }
        bail!("{} of {} documents failed to ingest", batch.failures.len(), files.len());
    }
    Ok(())
}

fn print_hits(hits: &[FusedHit]) {
    for (i, h) in hits.iter().enumerate() {
        let preview: String = h.payload.text().chars().take(160).collect();
        println!(
            "{:>2}. [{:.4}] {} · {} (page {})\n    {}",
            i + 1,
            h.hybrid_score,
            h.payload.doc_id(),
            h.payload.section_title(),
            h.payload.page_number(),
            preview.replace('\n', " ")
        );
    }
}

fn search(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    let query = args.positional.join(" ");
    if query.trim().is_empty() {
        bail!("search needs a query\n\n{USAGE}");
    }
    let retriever = open_retriever(settings, &paths(settings)?)?;
    let k = args.k.unwrap_or(settings.retrieval.top_k);
    let hits = retriever.search(&query, k, args.doc.as_deref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results for '{query}'");
    } else {
        print_hits(&hits);
    }
    Ok(())
}

fn ask(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    let question = args.positional.join(" ");
    if question.trim().is_empty() {
        bail!("ask needs a question\n\n{USAGE}");
    }
    let retriever = open_retriever(settings, &paths(settings)?)?;
    let model = OpenAiChatModel::from_config(&settings.completion)?;
    let pipeline = RagPipeline::new(retriever, model);
    let k = args.k.unwrap_or(settings.retrieval.top_k);
    let response = pipeline.query(&question, args.doc.as_deref(), k)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    println!("{}\n", response.answer);
    if !response.sources.is_empty() {
        println!("Sources:");
        print_hits(&response.sources);
    }
    Ok(())
}

fn delete(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    let [doc_id] = args.positional.as_slice() else {
        bail!("delete needs exactly one document id\n\n{USAGE}");
    };
    let paths = paths(settings)?;
    let mut retriever = open_retriever(settings, &paths)?;
    let removed = retriever.delete_document(doc_id)?;
    save_retriever(&retriever, &paths)?;
    println!("🗑  Removed {removed} chunks of '{doc_id}' from the dense index");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut raw: Vec<String> = env::args().skip(1).collect();
    if raw.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = raw.remove(0);
    let args = parse_args(&raw)?;
    let settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;

    match cmd.as_str() {
        "ingest" => ingest(&settings, &args),
        "search" => search(&settings, &args),
        "ask" => ask(&settings, &args),
        "delete" => delete(&settings, &args),
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(1);
        }
    }
}
