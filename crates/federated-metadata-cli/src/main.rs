//! Federated metadata CLI — `fedmd` command.
//!
//! Manages federation operator keys and builds, unpacks, verifies and
//! compares metadata statement chains.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use federated_metadata::chain::{
    build_chain, evaluate_trusted, ground, unpack, ChainDescriptor, ChainMode, GroundedStatement,
};
use federated_metadata::policy::{is_lesser, ClaimPolicy};
use federated_metadata::storage::{make_fs_key_bundle, FsKeyBundle, KeyExport, MetadataStore};
use federated_metadata::{FederationClaims, Operators, SignedStatement};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set; pass --home")?;
    Ok(PathBuf::from(home).join(".fedmd"))
}

fn fo_jwks_dir(home: &Path) -> PathBuf {
    home.join("fo_jwks")
}

fn mds_dir(home: &Path) -> PathBuf {
    home.join("mds")
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// fedmd — build and verify federated metadata statement chains.
#[derive(Parser, Debug)]
#[command(
    name = "fedmd",
    about = "Federated metadata statement CLI",
    version,
    long_about = "fedmd — federated metadata statement CLI\n\nManage federation operator keys, build compounded or indirected\nstatement chains, and unpack, verify and compare them."
)]
struct Cli {
    /// State directory (default: $HOME/.fedmd)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Claim policy JSON file (ignore / do_not_compare sets)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage operator keys
    Keys {
        #[command(subcommand)]
        subcommand: KeysCommands,
    },

    /// Build and sign a chain from a descriptor file
    Build {
        /// Path to the chain descriptor JSON
        descriptor: PathBuf,

        /// Store nested statements and reference them by URI
        #[arg(long)]
        indirect: bool,

        /// Base URI for references in indirect mode
        #[arg(long, default_value = "")]
        base_uri: String,
    },

    /// Decode a stored chain into its explicit claim tree (no verification)
    Unpack {
        /// Store key or URL whose last path segment is a store key
        reference: String,
    },

    /// Verify a chain and print the effective claims per federation
    Verify {
        /// Compact token, file holding one, or a store reference
        statement: String,

        /// Trusted federation operator (repeatable; default: every known)
        #[arg(long = "fo")]
        fos: Vec<String>,
    },

    /// Check whether claims in A are no broader than claims in B
    Compare {
        /// JSON file with the narrower claims
        a: PathBuf,
        /// JSON file with the broader claims
        b: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommands {
    /// Generate keys for operators that have none
    Init {
        /// Operator ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Keys per operator
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// List operators and their key ids
    List,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = run(cli, verbose);

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, verbose: bool) -> Result<()> {
    let home = match cli.home {
        Some(home) => home,
        None => default_home()?,
    };
    let policy = match &cli.policy {
        Some(path) => ClaimPolicy::from_json_file(path)
            .with_context(|| format!("failed to load policy {}", path.display()))?,
        None => ClaimPolicy::default(),
    };

    match cli.command {
        Commands::Keys { subcommand } => match subcommand {
            KeysCommands::Init { ids, count } => cmd_keys_init(&home, &ids, count, verbose),
            KeysCommands::List => cmd_keys_list(&home, verbose),
        },
        Commands::Build {
            descriptor,
            indirect,
            base_uri,
        } => cmd_build(&home, &descriptor, indirect, &base_uri, verbose),
        Commands::Unpack { reference } => cmd_unpack(&home, &reference, &policy, verbose),
        Commands::Verify { statement, fos } => cmd_verify(&home, &statement, &fos, &policy, verbose),
        Commands::Compare { a, b } => cmd_compare(&a, &b, verbose),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `fedmd keys init ID... [--count N]`
fn cmd_keys_init(home: &Path, ids: &[String], count: usize, verbose: bool) -> Result<()> {
    if count == 0 {
        return Err(anyhow!("--count must be at least 1"));
    }
    let dir = fo_jwks_dir(home);
    let bundle = make_fs_key_bundle(&dir, ids, count).context("failed to create key bundle")?;

    for id in ids {
        let keys = bundle.get(id)?;
        println!("{id}");
        for kid in keys.key_ids() {
            println!("  kid: {kid}");
        }
    }
    if verbose {
        println!("  Dir: {}", dir.display());
    }
    Ok(())
}

/// `fedmd keys list`
fn cmd_keys_list(home: &Path, verbose: bool) -> Result<()> {
    let dir = fo_jwks_dir(home);
    if !dir.exists() {
        println!(
            "No operators found (directory {} does not exist)",
            dir.display()
        );
        return Ok(());
    }

    let bundle = FsKeyBundle::open(&dir, KeyExport::Private).context("failed to open key bundle")?;
    if bundle.ids().is_empty() {
        println!("No operators found.");
        return Ok(());
    }
    for id in bundle.ids() {
        let keys = bundle.get(&id)?;
        println!("{id} ({} key(s))", keys.len());
        if verbose {
            println!(
                "{}",
                serde_json::to_string_pretty(&keys.export_public_jwks())?
            );
        }
    }
    Ok(())
}

/// `fedmd build DESCRIPTOR [--indirect] [--base-uri URI]`
fn cmd_build(
    home: &Path,
    descriptor: &Path,
    indirect: bool,
    base_uri: &str,
    verbose: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(descriptor)
        .with_context(|| format!("failed to read {}", descriptor.display()))?;
    let path = ChainDescriptor::from_json(&text)?;

    let bundle = FsKeyBundle::open(fo_jwks_dir(home), KeyExport::Private)
        .context("failed to open key bundle")?;
    let operators = Operators::from_bundle(bundle.bundle());

    let built = if indirect {
        let mut store = MetadataStore::open(mds_dir(home)).context("failed to open store")?;
        let mut mode = ChainMode::Indirect {
            store: &mut store,
            base_uri,
        };
        build_chain(&path, &operators, &mut mode)?
    } else {
        build_chain(&path, &operators, &mut ChainMode::Embed)?
    };

    if verbose {
        eprintln!("Built {} level(s), {} leaf statement(s)", path.len(), built.len());
    }

    let out: serde_json::Map<String, Value> = built
        .iter()
        .map(|(signer, reference)| (signer.clone(), Value::from(reference.as_str())))
        .collect();
    println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
    Ok(())
}

/// `fedmd unpack REFERENCE`
fn cmd_unpack(home: &Path, reference: &str, policy: &ClaimPolicy, verbose: bool) -> Result<()> {
    let store = MetadataStore::open(mds_dir(home)).context("failed to open store")?;
    let tree = unpack(reference, &store)?;
    if verbose {
        print_tree_summary(&tree);
    }
    println!("{}", serde_json::to_string_pretty(&tree.claim_tree(policy))?);
    Ok(())
}

/// `fedmd verify STATEMENT [--fo ID]...`
fn cmd_verify(
    home: &Path,
    statement: &str,
    fos: &[String],
    policy: &ClaimPolicy,
    verbose: bool,
) -> Result<()> {
    let input = match std::fs::read_to_string(statement) {
        Ok(content) => content.trim().to_string(),
        Err(_) => statement.to_string(),
    };

    let tree = if looks_like_token(&input) {
        ground(&SignedStatement::new(input))?
    } else {
        let store = MetadataStore::open(mds_dir(home)).context("failed to open store")?;
        unpack(&input, &store)?
    };
    if verbose {
        print_tree_summary(&tree);
    }

    let bundle = FsKeyBundle::open(fo_jwks_dir(home), KeyExport::Private)
        .context("failed to open key bundle")?
        .into_bundle();
    let bundle = if fos.is_empty() {
        bundle
    } else {
        bundle.subset(fos)?
    };

    let paths = evaluate_trusted(&tree, &bundle, policy)?;

    let out: Vec<Value> = paths.iter().map(claims_json).collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// `fedmd compare A B`
fn cmd_compare(a: &Path, b: &Path, verbose: bool) -> Result<()> {
    let a_value = read_json(a)?;
    let b_value = read_json(b)?;
    let lesser = is_lesser(&a_value, &b_value);
    println!("{lesser}");
    if verbose {
        eprintln!("{} is_lesser {}: {lesser}", a.display(), b.display());
    }
    if !lesser {
        return Err(anyhow!(
            "{} is broader than {}",
            a.display(),
            b.display()
        ));
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not JSON", path.display()))
}

fn looks_like_token(input: &str) -> bool {
    input.split('.').count() == 3 && !input.contains('/')
}

fn claims_json(claims: &FederationClaims) -> Value {
    json!({
        "fo": claims.fo,
        "signers": claims.signers,
        "claims": claims.claims,
    })
}

fn print_tree_summary(tree: &GroundedStatement) {
    eprintln!(
        "Chain: {} statement(s), depth {}",
        tree.size(),
        tree.depth()
    );
    for fo in tree.root_keys() {
        eprintln!("  Rooted in: {fo}");
    }
    if let Some(iat) = tree.unverified.get("iat").and_then(Value::as_i64) {
        eprintln!(
            "  Issued:    {}",
            federated_metadata::time::secs_to_rfc3339(iat)
        );
    }
}

