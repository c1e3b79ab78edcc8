//! Companion CLI for the `tbdb` library: build, inspect, sign, and verify
//! database files from the shell. Thin by design; this binary is not part
//! of the library's public contract, and exists to exercise it the way a
//! project's own `main.rs` always pairs a `clap::Parser` front end with its
//! core crate.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use tbdb::container;
use tbdb::data_blocks::append_data_block;
use tbdb::dedup::Writer;
use tbdb::reader::Database;
use tbdb::schema::manifest::{DEPENDENCY, DEPENDENCY_LIST, MANIFEST};
use tbdb::schema::Builder;
use tbdb::signing::default_impl::Ed25519Signer;
use tbdb::signing::Trust;
use tbdb::value::{read_blob, read_int, read_obj};

#[derive(Parser)]
#[command(name = "tbdb", about = "Build, inspect, sign, and verify TBDB files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a database file from a JSON manifest fixture.
    Build {
        #[arg(long, default_value_t = 1)]
        schema_id: u32,
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Parse a file and print its block list and root object.
    Inspect { file: PathBuf },
    /// Verify a file's signatures against a trusted public key.
    Verify {
        file: PathBuf,
        #[arg(long)]
        pubkey: PathBuf,
    },
    /// Sign a file with a private key, appending a SIG block.
    Sign {
        file: PathBuf,
        #[arg(long)]
        privkey: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Generate an ed25519 keypair for use with `sign`/`verify`.
    Keygen {
        #[arg(long)]
        out_prefix: PathBuf,
    },
}

#[derive(serde::Deserialize)]
struct ManifestFixture {
    name: String,
    version: u32,
    #[serde(default)]
    dependencies: Vec<DependencyFixture>,
}

#[derive(serde::Deserialize)]
struct DependencyFixture {
    name: String,
    version: u32,
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = EnvFilter::builder().with_default_directive(tracing::Level::INFO.into()).from_env_lossy();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
    guard
}

fn main() -> anyhow::Result<()> {
    let _guard = init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Build { schema_id, manifest, out } => build(schema_id, &manifest, &out),
        Command::Inspect { file } => inspect(&file),
        Command::Verify { file, pubkey } => verify(&file, &pubkey),
        Command::Sign { file, privkey, out } => sign(&file, &privkey, &out),
        Command::Keygen { out_prefix } => keygen(&out_prefix),
    }
}

fn build(schema_id: u32, manifest_path: &PathBuf, out_path: &PathBuf) -> anyhow::Result<()> {
    let text = fs::read_to_string(manifest_path)?;
    let fixture: ManifestFixture = serde_json::from_str(&text)?;

    let mut writer = Writer::new(64);

    let mut dep_builder = Builder::new_object(&mut writer, &DEPENDENCY);
    let mut dep_vals = Vec::with_capacity(fixture.dependencies.len());
    for dep in &fixture.dependencies {
        dep_builder.set_blob(1, dep.name.as_bytes())?;
        dep_builder.set_int(2, dep.version)?;
        dep_vals.push(dep_builder.commit()?);
    }

    let mut list_builder = Builder::new_array(&mut writer, &DEPENDENCY_LIST, dep_vals.len());
    for v in dep_vals {
        list_builder.append(v)?;
    }
    let deps = list_builder.commit()?;

    let mut manifest_builder = Builder::new_object(&mut writer, &MANIFEST);
    manifest_builder.set_blob(1, fixture.name.as_bytes())?;
    manifest_builder.set_int(2, fixture.version)?;
    manifest_builder.set_obj(3, deps)?;
    let root = manifest_builder.commit()?;
    writer.intern(&[&root.to_wire().to_le_bytes()], tbdb::dedup::Alignment::Four)?;

    let mut out = Vec::new();
    container::serialize(&mut out, schema_id, writer.as_slice(), &[])?;
    fs::write(out_path, &out)?;
    tracing::info!(path = %out_path.display(), bytes = out.len(), "wrote database");
    Ok(())
}

fn inspect(file: &PathBuf) -> anyhow::Result<()> {
    let bytes = fs::read(file)?;
    let parsed = container::parse(&bytes)?;
    println!("schema_id: {}", parsed.header.schema_id);
    println!("content bytes: {}", parsed.content.len());
    println!("signatures: {}", parsed.signatures.len());
    println!("data blocks: {}", parsed.data_blocks.len());

    let root = tbdb::value::root(&parsed.content);
    if let Some(obj) = read_obj(&parsed.content, root) {
        println!("root (manifest):");
        if let Some(name) = read_blob(&parsed.content, obj.field(1)) {
            println!("  name: {}", String::from_utf8_lossy(name));
        }
        if let Some(version) = read_int(&parsed.content, obj.field(2)) {
            println!("  version: {version}");
        }
        if let Some(count) = read_int(&parsed.content, obj.field(4)) {
            println!("  dependency_count: {count}");
        }
    }
    Ok(())
}

fn verify(file: &PathBuf, pubkey_path: &PathBuf) -> anyhow::Result<()> {
    let pubkey_bytes = fs::read(pubkey_path)?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(pubkey_bytes.as_slice().try_into()?)?;
    let verifier = tbdb::signing::default_impl::Ed25519Verifier::new(key);
    let trust = Trust::new().trust(Box::new(verifier));

    Database::open_mapped(file, read_schema_id(file)?, Some(&trust))?;
    println!("verified");
    Ok(())
}

fn sign(file: &PathBuf, privkey_path: &PathBuf, out_path: &PathBuf) -> anyhow::Result<()> {
    let key_bytes = fs::read(privkey_path)?;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(key_bytes.as_slice().try_into()?);
    let signer = Ed25519Signer::new(signing_key);
    let trust = Trust::new().hold(Box::new(signer));

    let bytes = fs::read(file)?;
    let parsed = container::parse(&bytes)?;

    let mut signatures: Vec<tbdb::signing::SignatureBlock> =
        parsed.signatures.iter().map(|raw| tbdb::signing::SignatureBlock::decode(raw)).collect::<Result<_, _>>()?;
    signatures.extend(trust.sign(parsed.header, parsed.content));

    let mut out = Vec::new();
    container::serialize(&mut out, parsed.header.schema_id, parsed.content, &signatures)?;
    for data in parsed.data_blocks {
        append_data_block(&mut out, data)?;
    }
    fs::write(out_path, &out)?;
    tracing::info!(path = %out_path.display(), "signed database");
    Ok(())
}

fn read_schema_id(file: &PathBuf) -> anyhow::Result<u32> {
    let bytes = fs::read(file)?;
    Ok(container::FileHeader::decode(&bytes)?.schema_id)
}

fn keygen(out_prefix: &PathBuf) -> anyhow::Result<()> {
    let signer = Ed25519Signer::generate(&mut OsRng);
    let priv_path = out_prefix.with_extension("priv");
    let pub_path = out_prefix.with_extension("pub");
    fs::write(&priv_path, signer.secret_bytes())?;
    fs::write(&pub_path, signer.verifying_key().public_bytes())?;
    tracing::info!(priv = %priv_path.display(), publ = %pub_path.display(), "generated keypair");
    Ok(())
}
