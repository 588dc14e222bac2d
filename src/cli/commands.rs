use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "deepresearch")]
#[command(about = "Deep research job tracker and document chat", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a research request and track it to completion
    Submit {
        /// Capability group (e.g. "Traditional Analysis")
        #[arg(long)]
        capability: String,
        /// Framework within the capability (e.g. "SWOT Analysis")
        #[arg(long)]
        framework: String,
        /// Free-text context for the research topic
        #[arg(long)]
        context: String,
        /// Override the framework's default scope
        #[arg(long)]
        scope: Option<String>,
        /// Override the framework's default depth
        #[arg(long)]
        depth: Option<String>,
        /// Override the framework's default rigor
        #[arg(long)]
        rigor: Option<String>,
        /// Override the framework's default perspective
        #[arg(long)]
        perspective: Option<String>,
    },
    /// Rejoin the research job persisted by a previous run
    Resume,
    /// Show which phase the persisted job is in
    Status,
    /// Cancel the persisted research job and clear its state
    Cancel,
    /// Ask a question about a generated document
    Chat {
        /// Document id the conversation is scoped to
        #[arg(long)]
        document: String,
        /// The question to ask
        question: String,
    },
    /// List the research catalog: capabilities and their frameworks
    Catalog,
    /// Manage the generated document library
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocsCommands {
    /// List generated documents
    List,
    /// Delete a document by id
    Delete { id: String },
}
