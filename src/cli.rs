// Command-line front end for lcwdelta.
//
// Subcommands map onto the library entry points: `compress`/`decompress`
// for LCW streams (raw or block-framed), `diff`/`patch` for XOR deltas and
// `inspect` for listing the commands of either kind of stream.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::frame::{self, BlockDecoder, BlockEncoder, FrameOptions};
use crate::lcw::{self, CompressOptions, DecodeStatus, config};
use crate::xor::{self, ApplyMode, Region};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

fn parse_block_size(s: &str) -> Result<usize, String> {
    let size = parse_byte_size(s)?;
    match usize::try_from(size) {
        Ok(n) if (1..=frame::MAX_BLOCK_SIZE).contains(&n) => Ok(n),
        _ => Err(format!(
            "block size {size} outside 1..={}",
            frame::MAX_BLOCK_SIZE
        )),
    }
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// LCW compressor and XOR-delta tool.
#[derive(Parser, Debug)]
#[command(
    name = "lcwdelta",
    version,
    about = "LCW compressor and XOR frame-delta tool",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// LCW-compress an input stream.
    Compress(CompressArgs),
    /// Decompress an LCW stream.
    Decompress(DecompressArgs),
    /// Write the XOR delta that turns a base frame into the input frame.
    Diff(DiffArgs),
    /// Apply an XOR delta to a base frame.
    Patch(PatchArgs),
    /// List the commands of an LCW stream or XOR delta.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StreamKind {
    Lcw,
    Xor,
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Compression level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = config::DEFAULT_LEVEL)]
    level: u32,

    /// Write a block-framed stream.
    #[arg(long)]
    framed: bool,

    /// Uncompressed bytes per block (supports K suffix).
    #[arg(long = "block-size", value_parser = parse_block_size, default_value_t = frame::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct DecompressArgs {
    /// Decompressed size of a raw stream (supports K/M/G suffix).
    #[arg(long, value_parser = parse_byte_size, required_unless_present = "framed", conflicts_with = "framed")]
    size: Option<u64>,

    /// Read a block-framed stream.
    #[arg(long)]
    framed: bool,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Base frame the delta is taken against.
    #[arg(long, short = 'b', value_hint = ValueHint::FilePath)]
    base: PathBuf,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Base frame to apply the delta to.
    #[arg(long, short = 'b', value_hint = ValueHint::FilePath)]
    base: PathBuf,

    /// Region width in bytes; the delta covers a window of the base.
    #[arg(long, requires = "stride")]
    width: Option<usize>,

    /// Distance between region rows in bytes.
    #[arg(long, requires = "width")]
    stride: Option<usize>,

    /// Store delta bytes instead of XORing them.
    #[arg(long = "copy")]
    copy_mode: bool,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Kind of stream to list.
    #[arg(long, value_enum, default_value_t = StreamKind::Lcw)]
    kind: StreamKind,

    /// Input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress,
    Decompress,
    Diff,
    Patch,
    Inspect,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    level: u32,
    framed: bool,
    block_size: usize,
    size: Option<u64>,
    base_file: Option<PathBuf>,
    region: Option<(usize, usize)>,
    copy_mode: bool,
    kind: StreamKind,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Options {
    fn with_io(mut self, io: IoArgs) -> Self {
        self.use_stdout = io.stdout;
        self.input_file = io.input.or(io.input_pos);
        self.output_file = io.output.or(io.output_pos);
        self
    }
}

fn resolve_options(cli: Cli) -> Options {
    let base = |command| Options {
        command,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        level: config::DEFAULT_LEVEL,
        framed: false,
        block_size: frame::DEFAULT_BLOCK_SIZE,
        size: None,
        base_file: None,
        region: None,
        copy_mode: false,
        kind: StreamKind::Lcw,
        input_file: None,
        output_file: None,
    };

    match cli.command {
        Cmd::Compress(args) => Options {
            level: args.level,
            framed: args.framed,
            block_size: args.block_size,
            ..base(Command::Compress)
        }
        .with_io(args.io),
        Cmd::Decompress(args) => Options {
            size: args.size,
            framed: args.framed,
            ..base(Command::Decompress)
        }
        .with_io(args.io),
        Cmd::Diff(args) => Options {
            base_file: Some(args.base),
            ..base(Command::Diff)
        }
        .with_io(args.io),
        Cmd::Patch(args) => Options {
            base_file: Some(args.base),
            region: args.width.zip(args.stride),
            copy_mode: args.copy_mode,
            ..base(Command::Patch)
        }
        .with_io(args.io),
        Cmd::Inspect(args) => Options {
            kind: args.kind,
            input_file: Some(args.input),
            ..base(Command::Inspect)
        },
        Cmd::Config => base(Command::Config),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("lcwdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

fn open_input(path: Option<&Path>) -> Option<Box<dyn Read>> {
    match path {
        Some(path) => match File::open(path) {
            Ok(f) => Some(Box::new(BufReader::with_capacity(BUF_SIZE, f))),
            Err(e) => {
                eprintln!("lcwdelta: input file: {}: {e}", path.display());
                None
            }
        },
        None => Some(Box::new(BufReader::new(io::stdin()))),
    }
}

fn read_input(opts: &Options) -> Option<Vec<u8>> {
    let mut reader = open_input(opts.input_file.as_deref())?;
    let mut data = Vec::new();
    if let Err(e) = reader.read_to_end(&mut data) {
        eprintln!("lcwdelta: read error: {e}");
        return None;
    }
    Some(data)
}

fn read_base(opts: &Options) -> Option<Vec<u8>> {
    let path = opts.base_file.as_deref()?;
    match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            eprintln!("lcwdelta: base file: {}: {e}", path.display());
            None
        }
    }
}

fn open_output(opts: &Options) -> Option<Box<dyn Write>> {
    match (opts.use_stdout, &opts.output_file) {
        (false, Some(path)) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "lcwdelta: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return None;
            }
            match File::create(path) {
                Ok(f) => Some(Box::new(BufWriter::with_capacity(BUF_SIZE, f))),
                Err(e) => {
                    eprintln!("lcwdelta: output file: {}: {e}", path.display());
                    None
                }
            }
        }
        _ => Some(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
    }
}

fn write_output(opts: &Options, data: &[u8]) -> bool {
    let Some(mut writer) = open_output(opts) else {
        return false;
    };
    if let Err(e) = writer.write_all(data).and_then(|()| writer.flush()) {
        eprintln!("lcwdelta: write error: {e}");
        return false;
    }
    true
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("lcwdelta: json error: {e}"),
    }
}

fn report(opts: &Options, summary: &str, json: serde_json::Value) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!("lcwdelta: {summary}");
    }
    if opts.json_output {
        print_json(&json);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("lcwdelta version {version}");

    let parallel = cfg!(feature = "parallel") as u8;
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_LEVEL={}", config::DEFAULT_LEVEL);
    for level in 0..=9 {
        let profile = config::config_for_level(level);
        eprintln!("LEVEL_{level}={}", profile.name);
    }
    eprintln!("MAX_LITERAL={}", lcw::MAX_LITERAL);
    eprintln!("MAX_ABSOLUTE_LEN={}", lcw::MAX_ABSOLUTE_LEN);
    eprintln!("RELATIVE_WINDOW={}", config::RELATIVE_WINDOW);
    eprintln!("DEFAULT_BLOCK_SIZE={}", frame::DEFAULT_BLOCK_SIZE);
    eprintln!("MAX_BLOCK_SIZE={}", frame::MAX_BLOCK_SIZE);
    eprintln!("XOR_MIN_FILL={}", xor::MIN_FILL);

    0
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

fn cmd_compress(opts: &Options) -> i32 {
    if opts.framed {
        return cmd_compress_framed(opts);
    }

    let Some(input) = read_input(opts) else {
        return 1;
    };
    let output = lcw::compress_with(&input, &CompressOptions { level: opts.level });
    if !write_output(opts, &output) {
        return 1;
    }

    report(
        opts,
        &format!(
            "compress: input size: {}, output size: {}, level: {}",
            input.len(),
            output.len(),
            opts.level
        ),
        serde_json::json!({
            "command": "compress",
            "input_size": input.len(),
            "output_size": output.len(),
            "level": opts.level,
        }),
    );
    0
}

fn cmd_compress_framed(opts: &Options) -> i32 {
    let Some(mut reader) = open_input(opts.input_file.as_deref()) else {
        return 1;
    };
    let Some(writer) = open_output(opts) else {
        return 1;
    };
    let frame_opts = FrameOptions {
        block_size: opts.block_size,
        level: opts.level,
    };
    let mut encoder = match BlockEncoder::new(writer, frame_opts) {
        Ok(enc) => enc,
        Err(e) => {
            eprintln!("lcwdelta: {e}");
            return 1;
        }
    };

    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = encoder.write(&buf[..n]) {
                    eprintln!("lcwdelta: compress error: {e}");
                    return 1;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                eprintln!("lcwdelta: read error: {e}");
                return 1;
            }
        }
    }

    let total_in = encoder.bytes_in();
    let blocks = match encoder.finish() {
        Ok((_, blocks)) => blocks,
        Err(e) => {
            eprintln!("lcwdelta: compress finish error: {e}");
            return 1;
        }
    };

    report(
        opts,
        &format!(
            "compress: input size: {total_in}, blocks: {blocks}, block size: {}",
            opts.block_size
        ),
        serde_json::json!({
            "command": "compress",
            "input_size": total_in,
            "blocks": blocks,
            "block_size": opts.block_size,
            "level": opts.level,
        }),
    );
    0
}

// ---------------------------------------------------------------------------
// Decompress command
// ---------------------------------------------------------------------------

fn cmd_decompress(opts: &Options) -> i32 {
    if opts.framed {
        return cmd_decompress_framed(opts);
    }

    let Some(size) = opts.size.and_then(|s| usize::try_from(s).ok()) else {
        eprintln!("lcwdelta: decompress requires --size for raw streams");
        return 1;
    };
    let Some(input) = read_input(opts) else {
        return 1;
    };
    let mut output = Vec::new();
    let capacity = decode_capacity(size, input.len());
    if let Err(e) = output.try_reserve_exact(capacity) {
        eprintln!("lcwdelta: decompress error: cannot allocate {capacity} bytes: {e}");
        return 1;
    }
    output.resize(capacity, 0);
    let decoded = lcw::decompress_into(&input, &mut output);
    output.truncate(decoded.written);
    if !write_output(opts, &output) {
        return 1;
    }

    report(
        opts,
        &format!(
            "decompress: input size: {}, output size: {}, status: {:?}",
            input.len(),
            decoded.written,
            decoded.status
        ),
        serde_json::json!({
            "command": "decompress",
            "input_size": input.len(),
            "output_size": decoded.written,
            "consumed": decoded.consumed,
            "status": format!("{:?}", decoded.status),
        }),
    );

    match decoded.status {
        DecodeStatus::EndMarker => 0,
        DecodeStatus::OutputFull => {
            if !opts.quiet {
                eprintln!("lcwdelta: warning: output filled at {size} bytes before end of stream");
            }
            0
        }
        status => {
            eprintln!(
                "lcwdelta: decompress error: stream stopped early ({status:?}) after {} bytes",
                decoded.written
            );
            1
        }
    }
}

/// Output buffer size for a raw stream: `--size`, but no more than
/// `input_len` bytes of LCW could ever expand to.
fn decode_capacity(size: usize, input_len: usize) -> usize {
    // A 4-byte fill or 5-byte long copy yields at most 0xFFFF bytes.
    let reachable = input_len.saturating_mul(lcw::MAX_ABSOLUTE_LEN.div_ceil(4));
    size.min(reachable)
}

fn cmd_decompress_framed(opts: &Options) -> i32 {
    let Some(reader) = open_input(opts.input_file.as_deref()) else {
        return 1;
    };
    let Some(mut writer) = open_output(opts) else {
        return 1;
    };

    let mut decoder = BlockDecoder::new(reader);
    let total = match decoder.decode_to(&mut writer) {
        Ok(total) => total,
        Err(e) => {
            eprintln!("lcwdelta: decompress error: {e}");
            return 1;
        }
    };
    if let Err(e) = writer.flush() {
        eprintln!("lcwdelta: write flush error: {e}");
        return 1;
    }

    let blocks = decoder.blocks_decoded();
    report(
        opts,
        &format!("decompress: output size: {total}, blocks: {blocks}"),
        serde_json::json!({
            "command": "decompress",
            "output_size": total,
            "blocks": blocks,
        }),
    );
    0
}

// ---------------------------------------------------------------------------
// Diff / patch commands
// ---------------------------------------------------------------------------

fn cmd_diff(opts: &Options) -> i32 {
    let Some(base) = read_base(opts) else {
        return 1;
    };
    let Some(source) = read_input(opts) else {
        return 1;
    };
    if source.len() != base.len() && !opts.quiet {
        eprintln!(
            "lcwdelta: warning: frame sizes differ ({} vs {}), diffing the first {} bytes",
            source.len(),
            base.len(),
            source.len().min(base.len())
        );
    }

    let delta = xor::generate_delta(&source, &base);
    if !write_output(opts, &delta) {
        return 1;
    }

    report(
        opts,
        &format!(
            "diff: frame size: {}, delta size: {}",
            source.len().min(base.len()),
            delta.len()
        ),
        serde_json::json!({
            "command": "diff",
            "frame_size": source.len().min(base.len()),
            "delta_size": delta.len(),
        }),
    );
    0
}

fn cmd_patch(opts: &Options) -> i32 {
    let Some(mut frame) = read_base(opts) else {
        return 1;
    };
    let Some(delta) = read_input(opts) else {
        return 1;
    };

    let mode = if opts.copy_mode {
        ApplyMode::Copy
    } else {
        ApplyMode::Xor
    };
    // Without a region the whole frame is one row.
    let whole = frame.len().max(1);
    let (width, stride) = opts.region.unwrap_or((whole, whole));
    let region = match Region::new(width, stride) {
        Ok(region) => region,
        Err(e) => {
            eprintln!("lcwdelta: {e}");
            return 1;
        }
    };
    let applied = xor::apply_delta_region(&mut frame, region, mode, &delta);

    if applied.is_truncated() {
        eprintln!(
            "lcwdelta: patch error: delta stopped early ({:?}) at position {}",
            applied.status, applied.position
        );
        return 1;
    }
    if !write_output(opts, &frame) {
        return 1;
    }

    report(
        opts,
        &format!(
            "patch: frame size: {}, delta size: {}, status: {:?}",
            frame.len(),
            delta.len(),
            applied.status
        ),
        serde_json::json!({
            "command": "patch",
            "frame_size": frame.len(),
            "delta_size": delta.len(),
            "consumed": applied.consumed,
            "status": format!("{:?}", applied.status),
        }),
    );
    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(path) = opts.input_file.as_deref() else {
        eprintln!("lcwdelta: inspect requires an input file");
        return 1;
    };
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("lcwdelta: {}: {e}", path.display());
            return 1;
        }
    };

    let (commands, output_len, malformed) = match opts.kind {
        StreamKind::Lcw => inspect_lcw(&data),
        StreamKind::Xor => inspect_xor(&data),
    };
    if malformed {
        eprintln!("lcwdelta: stream is cut off after {commands} commands");
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "inspect",
            "kind": format!("{:?}", opts.kind).to_lowercase(),
            "stream_size": data.len(),
            "commands": commands,
            "output_size": output_len,
            "malformed": malformed,
        }));
    }

    if malformed { 1 } else { 0 }
}

fn inspect_lcw(data: &[u8]) -> (usize, usize, bool) {
    let mut iter = lcw::Commands::new(data);
    println!("LCW address mode:   {:?}", iter.mode());
    let mut count = 0usize;
    let mut produced = 0usize;
    let mut at = iter.position();
    for cmd in iter.by_ref() {
        println!("{at:08}  {produced:08}  {cmd:?}");
        count += 1;
        produced += cmd.output_len();
        at += cmd.encoded_len();
    }
    println!("LCW commands:       {count}");
    println!("LCW decoded size:   {produced}");
    (count, produced, iter.is_malformed())
}

fn inspect_xor(data: &[u8]) -> (usize, usize, bool) {
    let mut iter = xor::Commands::new(data);
    let mut count = 0usize;
    let mut covered = 0usize;
    let mut at = 0usize;
    while let Some(cmd) = iter.next() {
        println!("{at:08}  {covered:08}  {cmd:?}");
        count += 1;
        covered += cmd.span();
        at = iter.position();
    }
    println!("XOR commands:       {count}");
    println!("XOR frame span:     {covered}");
    (count, covered, iter.is_malformed())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && !opts.quiet
        && let Some(path) = &opts.output_file
    {
        eprintln!(
            "lcwdelta: warning: -c option overrides output filename: {}",
            path.display()
        );
    }
    if opts.use_stdout {
        opts.output_file = None;
    }

    let exit_code = match opts.command {
        Command::Compress => cmd_compress(&opts),
        Command::Decompress => cmd_decompress(&opts),
        Command::Diff => cmd_diff(&opts),
        Command::Patch => cmd_patch(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
