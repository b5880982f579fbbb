mod config;
mod layers;

use crate::config::Config;
use crate::layers::classification::{ChatCompletionsClient, Classifier};
use crate::layers::download::Downloader;
use crate::layers::index::TitleIndex;
use crate::layers::library::list_pdf_tree;
use crate::layers::organize::Reorganizer;
use crate::layers::parsing::parse_grouped_titles;
use crate::layers::resolution::{JaroWinkler, NormalizedLevenshtein, TitleResolver};
use crate::layers::selection::{RecommendationCache, save_selection};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Save research papers and organize them into topic folders")]
struct Args {
    /// Knowledge base root (overrides KNOWLEDGE_BASE_PATH)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    root: Option<PathBuf>,

    /// Print debug information
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    /// Similarity measure used to match titles to files
    #[arg(short, long, global = true, value_enum, default_value_t = Matcher::Ratio)]
    matcher: Matcher,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Matcher {
    /// Ratio of matching character blocks
    Ratio,
    /// Normalized Levenshtein distance
    Levenshtein,
    /// Jaro-Winkler similarity
    JaroWinkler,
}

#[derive(Subcommand)]
enum Command {
    /// Print the knowledge base folder tree as JSON
    List,

    /// Move papers into folders from grouped titles
    ///
    /// The input lists each group name on its own line, followed by its titles
    /// wrapped in double quotes, one per line.
    Organize {
        /// File with the grouped titles, or "-" for stdin
        #[arg(default_value = "-")]
        groups: String,
    },

    /// Ask the language model to group the saved papers
    Classify {
        /// How to group the papers, e.g. "research topic"
        #[arg(required_unless_present = "prompt")]
        criteria: Option<String>,

        /// Send this complete prompt instead of listing the saved titles
        #[arg(short, long, conflicts_with = "criteria")]
        prompt: Option<String>,

        /// Reorganize the knowledge base with the resulting groups
        #[arg(short, long)]
        apply: bool,
    },

    /// Download a single arXiv paper into the knowledge base
    Fetch {
        /// arXiv abstract or PDF link
        url: String,

        /// Title used for the saved file name
        title: String,
    },

    /// Save recommended papers selected by a free-text reply
    Save {
        /// JSON file with the recommended papers
        #[arg(short = 'f', long)]
        recommendations: PathBuf,

        /// Reply such as "save all" or "the 1st and 3rd"
        #[arg(num_args = 1.., required = true)]
        reply: Vec<String>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_groups(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read grouped titles from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read grouped titles from {}", source))
    }
}

fn organize(root: &Path, grouped_text: &str, matcher: Matcher) -> Result<()> {
    let groups = parse_grouped_titles(grouped_text);
    if groups.is_empty() {
        println!("No groups with quoted titles found, nothing to do.");
        return Ok(());
    }
    tracing::info!(
        "Organizing {} titles into {} groups",
        groups.title_count(),
        groups.len()
    );

    let records = match matcher {
        Matcher::Ratio => Reorganizer::new(root).run(&groups)?,
        Matcher::Levenshtein => {
            Reorganizer::with_resolver(root, TitleResolver::new(NormalizedLevenshtein))
                .run(&groups)?
        }
        Matcher::JaroWinkler => {
            Reorganizer::with_resolver(root, TitleResolver::new(JaroWinkler)).run(&groups)?
        }
    };
    for record in &records {
        println!("{}", record);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 0. Load Configuration
    dotenv().ok();

    // Auto-create .env if it doesn't exist (copy from .env.example)
    if !Path::new(".env").exists() && Path::new(".env.example").exists() {
        eprintln!("Creating .env from .env.example...");
        std::fs::copy(".env.example", ".env")?;
        dotenvy::from_filename(".env").ok();
    }

    let args = Args::parse();
    init_logging(args.debug);

    let config = Config::from_env();
    let root = args.root.unwrap_or(config.knowledge_base.clone());

    match args.command {
        Command::List => {
            let tree = list_pdf_tree(&root)?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Command::Organize { groups } => {
            let text = read_groups(&groups)?;
            organize(&root, &text, args.matcher)?;
        }
        Command::Classify {
            criteria,
            prompt,
            apply,
        } => {
            let client = ChatCompletionsClient::new(
                config.llm_endpoint,
                config.llm_api_key,
                config.llm_model,
            );
            let classifier = Classifier::new(client);
            let groups = match (prompt, criteria) {
                (Some(prompt), _) => classifier.classify_prompt(&prompt).await?,
                (None, criteria) => {
                    let titles = TitleIndex::build(&root).document_titles();
                    if titles.is_empty() {
                        println!("No PDFs found in {}.", root.display());
                        return Ok(());
                    }
                    let criteria = criteria.unwrap_or_default();
                    classifier.classify_titles(&titles, &criteria).await?
                }
            };
            let grouped_text = groups.to_grouped_text();
            println!("{}", grouped_text);

            if apply {
                println!();
                organize(&root, &grouped_text, args.matcher)?;
            }
        }
        Command::Fetch { url, title } => {
            let downloader = Downloader::new(&root);
            let path = downloader.save_arxiv_pdf(&url, &title).await?;
            println!("PDF saved to: {}", path.display());
        }
        Command::Save { recommendations, reply } => {
            let cache = RecommendationCache::load(&recommendations)?;
            let reply = reply.join(" ");
            let downloader = Downloader::new(&root);
            let outcomes = save_selection(&cache, &reply, &downloader).await;
            if outcomes.is_empty() {
                println!("No papers matched the reply.");
            }
            for outcome in &outcomes {
                println!("{}", outcome);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_accepts_prompt_without_criteria() {
        let args = Args::try_parse_from(["paper-shelf", "classify", "--prompt", "group these"])
            .unwrap();
        let Command::Classify {
            criteria,
            prompt,
            apply,
        } = args.command
        else {
            panic!("expected classify");
        };
        assert_eq!(criteria, None);
        assert_eq!(prompt.as_deref(), Some("group these"));
        assert!(!apply);
    }

    #[test]
    fn test_classify_accepts_criteria() {
        let args = Args::try_parse_from(["paper-shelf", "classify", "topic", "--apply"]).unwrap();
        let Command::Classify {
            criteria, apply, ..
        } = args.command
        else {
            panic!("expected classify");
        };
        assert_eq!(criteria.as_deref(), Some("topic"));
        assert!(apply);
    }

    #[test]
    fn test_classify_needs_exactly_one_of_criteria_or_prompt() {
        assert!(Args::try_parse_from(["paper-shelf", "classify"]).is_err());
        assert!(Args::try_parse_from(["paper-shelf", "classify", "topic", "-p", "x"]).is_err());
    }
}
