// crates/verity-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verity_core::params::SUPERBLOCK_SIZE;
use verity_core::{Encoder, MappingTable, Superblock, VerityParams};

#[derive(Parser, Debug)]
#[command(
    name = "mkverity",
    about = "Build dm-verity hash images",
    long_about = "Build dm-verity hash images.\n\nCopies a data image into an output image, appends its dm-verity hash tree and prints the device-mapper table that maps it.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Copy a data image and append its hash tree; print the mapping table.
    Create(CreateArgs),

    /// Decode and print the verity superblock stored in an image.
    Inspect {
        /// Image holding the superblock
        #[arg(long)]
        image: PathBuf,

        /// Byte offset of the superblock within the image
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct CreateArgs {
    /// Input data image (regular file, whole number of blocks)
    #[arg(long)]
    input: PathBuf,

    /// Output image: the data followed by the hash tree. Must not exist.
    #[arg(long)]
    output: PathBuf,

    /// Data device name to put in the mapping table instead of the input path
    #[arg(long)]
    data_alias: Option<String>,

    /// Hash device name to put in the mapping table instead of the output path
    #[arg(long)]
    hash_alias: Option<String>,

    /// Save the mapping table to this file instead of printing it
    #[arg(long)]
    table: Option<PathBuf>,

    /// Write a verity superblock in front of the hash tree
    #[arg(long, default_value_t = false)]
    superblock: bool,

    /// Fixed salt, hex encoded (default: random)
    #[arg(long, value_parser = parse_hex)]
    salt: Option<::std::vec::Vec<u8>>,

    /// Fixed superblock UUID, 32 hex digits (default: random)
    #[arg(long, value_parser = parse_uuid)]
    uuid: Option<[u8; 16]>,

    /// TOML profile with block sizes and salt length
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Emit the mapping table as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Create(args) => create(&args),
        Cmd::Inspect { image, offset } => inspect(&image, offset),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    hex::decode(s).map_err(|e| format!("invalid hex: {e}"))
}

fn parse_uuid(s: &str) -> Result<[u8; 16], String> {
    let bytes = parse_hex(&s.replace('-', ""))?;
    <[u8; 16]>::try_from(bytes.as_slice()).map_err(|_| format!("uuid must be 16 bytes, got {}", bytes.len()))
}

/// Ensure the parent directory for a file exists.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

fn load_params(args: &CreateArgs) -> Result<VerityParams> {
    let mut params = match &args.profile {
        Some(path) => {
            let src = fs::read_to_string(path)
                .with_context(|| format!("read profile {}", path.display()))?;
            toml::from_str::<VerityParams>(&src)
                .with_context(|| format!("parse profile {}", path.display()))?
        }
        None => VerityParams::default(),
    };
    params.salt.clone_from(&args.salt);
    params.uuid = args.uuid;
    params.validate().context("invalid verity parameters")?;
    Ok(params)
}

fn create(args: &CreateArgs) -> Result<()> {
    let table = create_image(args)?;

    if let Some(path) = &args.table {
        ensure_parent_dir(path)?;
        fs::write(path, render(&table, args.json)?)
            .with_context(|| format!("writing mapping table to {}", path.display()))?;
        info!(table=%path.display(), "saved mapping table");
    } else {
        println!("{}", render(&table, args.json)?);
    }
    Ok(())
}

fn render(table: &MappingTable, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(table).context("serialize mapping table")
    } else {
        Ok(table.to_string())
    }
}

/// Copy `args.input` into `args.output`, append the hash tree and return
/// the table mapping the result.
fn create_image(args: &CreateArgs) -> Result<MappingTable> {
    let params = load_params(args)?;
    let block = u64::from(params.data_block_size.max(params.hash_block_size));

    let mut data = File::open(&args.input)
        .with_context(|| format!("opening data image {}", args.input.display()))?;
    let meta = data
        .metadata()
        .with_context(|| format!("stat-ing data image {}", args.input.display()))?;
    if !meta.is_file() {
        bail!("the data image {} must be a regular file", args.input.display());
    }
    let data_size = meta.len();
    if data_size % block != 0 {
        bail!("the data image must end on a {block}-byte block boundary (size {data_size})");
    }

    ensure_parent_dir(&args.output)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&args.output)
        .with_context(|| format!("creating output image {}", args.output.display()))?;
    // From here on, any early return deletes the half-written image.
    let mut out = PartialOutput::new(file, &args.output);

    info!(input=%args.input.display(), output=%args.output.display(), bytes = data_size, "copying data image");
    io::copy(&mut data, out.file()).context("copying the data image")?;
    data.seek(SeekFrom::Start(0)).context("rewinding the data image")?;

    let hash_block_size = u64::from(params.hash_block_size);
    let mut enc = Encoder::new(BufWriter::new(out.file()), params, args.superblock)
        .context("initializing the verity encoder")?;
    io::copy(&mut BufReader::new(&mut data), &mut enc).context("hashing the data image")?;
    enc.close().context("writing the hash tree")?;

    // The tree starts right after the copied data.
    let mut table = enc
        .mapping_table_at(
            args.input.display().to_string(),
            args.output.display().to_string(),
            data_size / hash_block_size,
        )
        .context("building the mapping table")?;
    if let Some(alias) = &args.data_alias {
        table.data_device.clone_from(alias);
    }
    if let Some(alias) = &args.hash_alias {
        table.hash_device.clone_from(alias);
    }

    info!(
        data_blocks = table.data_blocks,
        hash_start = table.hash_start,
        root = %hex::encode(table.root_hash),
        "hash tree appended"
    );
    drop(enc);
    out.keep();
    Ok(table)
}

/// An output image that is removed again on drop unless [`Self::keep`] is
/// called.
struct PartialOutput<'a> {
    file: File,
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialOutput<'a> {
    fn new(file: File, path: &'a Path) -> Self {
        Self {
            file,
            path,
            armed: true,
        }
    }

    fn file(&mut self) -> &mut File {
        &mut self.file
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => warn!(output=%self.path.display(), "removed partially written output image"),
            Err(e) => warn!(output=%self.path.display(), error=%e, "could not remove partially written output image"),
        }
    }
}

fn inspect(image: &Path, offset: u64) -> Result<()> {
    let sb = read_superblock(image, offset)?;
    describe(&sb, &mut io::stdout().lock()).context("writing superblock fields")
}

fn describe<W: Write>(sb: &Superblock, out: &mut W) -> io::Result<()> {
    writeln!(out, "uuid:            {}", hex::encode(sb.uuid()))?;
    writeln!(out, "algorithm:       {}", sb.algorithm_name())?;
    writeln!(out, "data block size: {}", sb.data_block_size())?;
    writeln!(out, "hash block size: {}", sb.hash_block_size())?;
    writeln!(out, "data blocks:     {}", sb.data_blocks())?;
    writeln!(out, "salt:            {}", hex::encode(sb.salt()))?;
    Ok(())
}

fn read_superblock(image: &Path, offset: u64) -> Result<Superblock> {
    let mut f = File::open(image).with_context(|| format!("opening {}", image.display()))?;
    f.seek(SeekFrom::Start(offset))
        .with_context(|| format!("seeking to {offset} in {}", image.display()))?;
    let mut header = vec![0u8; SUPERBLOCK_SIZE];
    f.read_exact(&mut header)
        .with_context(|| format!("reading superblock at {offset} in {}", image.display()))?;
    Superblock::decode(&header).with_context(|| format!("decoding superblock in {}", image.display()))
}
