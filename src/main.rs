//! Thin command-line surface over the core contracts.
//!
//! Every subcommand is a direct call into `Indexer`, `Retriever`, or
//! `KnowledgeGraph`; no logic lives here.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry::graph::NodeFilter;
use quarry::indexing::SymbolSearchOptions;
use quarry::retrieve::{RetrieveOptions, Retriever};
use quarry::types::SymbolKind;
use quarry::{Indexer, Settings};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quarry", version, about = "Local code intelligence: index, graph, and retrieve")]
struct Cli {
    /// Project root (defaults to the current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Emit JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the tree and publish a new index generation.
    Index,
    /// Retrieve context chunks for a query.
    Retrieve {
        query: String,
        /// Token budget for the packed context.
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Substring allow-list on file paths (repeatable).
        #[arg(long)]
        file: Vec<String>,
    },
    /// Search symbols by name substring.
    Symbols {
        query: String,
        /// Filter by kind (function, class, method, ...).
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        exported: bool,
    },
    /// One-hop callers of a symbol.
    Callers { name: String },
    /// One-hop callees of a symbol.
    Callees { name: String },
    /// Inheritance chain of a class/interface, ancestors first.
    Inheritance { name: String },
    /// Files a file depends on, and its dependents.
    Deps { path: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let settings = Settings::load_for(&root).context("loading configuration")?;
    settings.validate()?;
    quarry::logging::init_with_config(&settings.logging);

    let indexer = Indexer::new(Arc::new(settings.clone()));
    indexer.initialize()?;

    match cli.command {
        Command::Index => {
            let index = indexer.index()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&*index)?);
            } else {
                println!(
                    "generation {} | {} files, {} symbols, {} chunks",
                    index.generation, index.total_files, index.total_symbols, index.total_chunks
                );
            }
        }
        Command::Retrieve {
            query,
            max_tokens,
            file,
        } => {
            ensure_indexed(&indexer)?;
            let retriever = Retriever::new(settings.retrieval.clone());
            let options = RetrieveOptions {
                max_tokens: max_tokens.unwrap_or(settings.retrieval.max_tokens),
                files: file,
                ..Default::default()
            };
            let context = indexer.retrieve(&retriever, &query, &options)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                println!("{}", context.format());
                eprintln!(
                    "-- {} chunks, {} tokens ({:?} tier)",
                    context.chunks.len(),
                    context.token_count,
                    context.tier
                );
            }
        }
        Command::Symbols {
            query,
            kind,
            exported,
        } => {
            ensure_indexed(&indexer)?;
            let options = SymbolSearchOptions {
                kind: kind.as_deref().and_then(SymbolKind::from_str_loose),
                exported_only: exported,
                ..Default::default()
            };
            let refs = indexer.search_symbols(&query, &options);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&refs)?);
            } else if refs.is_empty() {
                eprintln!("No symbols match '{query}'");
            } else {
                for r in refs {
                    println!("{}:{} {} {}{}", r.file_path, r.line, r.kind, r.name, if r.exported { " (exported)" } else { "" });
                }
            }
        }
        Command::Callers { name } => {
            ensure_indexed(&indexer)?;
            print_neighbors(cli.json, &indexer, &name, true)?;
        }
        Command::Callees { name } => {
            ensure_indexed(&indexer)?;
            print_neighbors(cli.json, &indexer, &name, false)?;
        }
        Command::Inheritance { name } => {
            ensure_indexed(&indexer)?;
            let chain = indexer.with_graph(|graph| {
                let node_id = find_symbol_node(graph, &name)?;
                Some(
                    graph
                        .get_inheritance_chain(&node_id, true)
                        .into_iter()
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            });
            match chain {
                Some(nodes) if cli.json => println!("{}", serde_json::to_string_pretty(&nodes)?),
                Some(nodes) => {
                    for node in nodes {
                        println!("{} ({})", node.name, node.id);
                    }
                }
                None => eprintln!("No symbol named '{name}'"),
            }
        }
        Command::Deps { path } => {
            ensure_indexed(&indexer)?;
            let dependencies = indexer.get_dependencies(&path);
            let dependents = indexer.get_dependents(&path);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "path": path,
                        "dependencies": dependencies,
                        "dependents": dependents,
                    })
                );
            } else {
                println!("{path}");
                for d in &dependencies {
                    println!("  -> {d}");
                }
                for d in &dependents {
                    println!("  <- {d}");
                }
            }
        }
    }

    Ok(())
}

/// Index lazily on first query so `quarry retrieve` works cold.
fn ensure_indexed(indexer: &Indexer) -> Result<()> {
    if indexer.get_index().generation == 0 {
        indexer.index()?;
    }
    Ok(())
}

fn find_symbol_node(graph: &quarry::KnowledgeGraph, name: &str) -> Option<String> {
    let mut nodes = graph.find_nodes(&NodeFilter {
        name_regex: Some(format!("^{}$", regex::escape(name))),
        ..Default::default()
    });
    nodes.retain(|n| n.node_type != quarry::NodeType::File);
    nodes.first().map(|n| n.id.clone())
}

fn print_neighbors(json: bool, indexer: &Indexer, name: &str, callers: bool) -> Result<()> {
    let nodes = indexer.with_graph(|graph| {
        let node_id = find_symbol_node(graph, name)?;
        let neighbors = if callers {
            graph.get_callers(&node_id)
        } else {
            graph.get_callees(&node_id)
        };
        Some(neighbors.into_iter().cloned().collect::<Vec<_>>())
    });

    match nodes {
        Some(nodes) if json => println!("{}", serde_json::to_string_pretty(&nodes)?),
        Some(nodes) if nodes.is_empty() => {
            eprintln!("No {} for '{name}'", if callers { "callers" } else { "callees" });
        }
        Some(nodes) => {
            for node in nodes {
                match (&node.file_path, node.line) {
                    (Some(path), Some(line)) => println!("{path}:{line} {}", node.name),
                    _ => println!("{}", node.name),
                }
            }
        }
        None => eprintln!("No symbol named '{name}'"),
    }
    Ok(())
}
