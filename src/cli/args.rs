//! CLI argument structs.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(after_long_help = r#"WHAT IT DOES:
  Parses the package's C# sources with tree-sitter and emits the public API
  surface as JSON: namespaces, types (class/record/struct/interface/enum/
  delegate), public members with normalized signatures, entry-point flags,
  and externally-referenced dependency types grouped by package.

  Partial declarations merge into one type. Signatures drop System.*
  qualifiers, keep generic structure, and collapse long parameter defaults.

EXAMPLES:
  Extract to stdout:   surface extract --dir ./sdk
  Pretty-printed:      surface extract --dir ./sdk --pretty
  Bounded parallelism: surface extract --dir ./sdk --threads 4
"#)]
pub struct ExtractArgs {
    /// Package root to scan (must contain the source tree)
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Worker threads for the parse phase. 0 = auto. Capped at 8 either
    /// way; beyond that memory bandwidth dominates.
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"WHAT IT DOES:
  Renders the extracted API as compact C#-shaped stubs, prioritized for
  prompting: client types first, then their dependencies, error types,
  enums, model types, and the rest, all under a character budget.

EXAMPLES:
  Default budget:      surface stubs --dir ./sdk
  Unlimited:           surface stubs --dir ./sdk --budget 0
"#)]
pub struct StubsArgs {
    /// Package root to scan
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Worker threads for the parse phase (0 = auto)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Character budget for the stub bundle (0 = unlimited)
    #[arg(short, long, default_value = "60000")]
    pub budget: usize,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"WHAT IT DOES:
  Extracts the API, computes the client surface (entry points + reachable
  types), scans a sample corpus for demonstrating call sites, and reports
  covered vs uncovered operations.

  With --helper, an external analyzer is spawned instead of the native
  syntactic walk: it receives the API JSON on stdin and the sample root as
  an argument, and emits NDJSON covered/error records on stdout.

EXAMPLES:
  Native walk:         surface coverage --dir ./sdk --samples ./samples
  Coverage stubs:      surface coverage --dir ./sdk --samples ./samples --stubs
  External helper:     surface coverage --dir ./sdk --samples ./samples \
                           --helper ./analyzers/usage.py
"#)]
pub struct CoverageArgs {
    /// Package root to scan
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Root of the sample corpus to score
    #[arg(short, long)]
    pub samples: String,

    /// External usage-helper executable; omitted = native syntactic walk
    #[arg(long)]
    pub helper: Option<String>,

    /// Helper timeout in seconds; the child is killed on expiry
    #[arg(long, default_value = "120")]
    pub timeout: u64,

    /// Render coverage-aware stubs instead of the JSON usage index
    #[arg(long)]
    pub stubs: bool,

    /// Character budget for --stubs output (0 = unlimited)
    #[arg(short, long, default_value = "60000")]
    pub budget: usize,

    /// Worker threads for the parse phase (0 = auto)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"WHAT IT DOES:
  Extracts the API and prints a human-oriented summary: package identity,
  namespace and type counts by kind, entry points, client surface, and
  referenced dependency packages. Nothing is written to disk.

EXAMPLES:
  surface info --dir ./sdk
"#)]
pub struct InfoArgs {
    /// Package root to scan
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Worker threads for the parse phase (0 = auto)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,
}
