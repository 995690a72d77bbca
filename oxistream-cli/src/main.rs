//! OxiStream CLI - chunked streaming compression
//!
//! Compresses and decompresses deflate, zlib and gzip data by feeding fixed
//! size chunks through the streaming API, growing the output buffer whenever
//! a call reports `BufferOverflow`.

mod utils;

use bytes::BytesMut;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use log::{LevelFilter, debug, info};
use oxistream_deflate::{
    CompressionAlgorithm, Compressor, Decompressor, StepStatus, StreamError, Variant,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use utils::{create_progress_bar, parse_size, space_savings};

#[derive(Parser)]
#[command(name = "oxistream")]
#[command(author, version, about = "Chunked streaming deflate, zlib and gzip")]
#[command(long_about = "
OxiStream compresses and decompresses data chunk by chunk through a
streaming deflate engine. Input and output default to stdin and stdout.

Examples:
  oxistream compress file.txt -o file.txt.gz
  oxistream compress -a zlib --chunk-size 64K < data.bin > data.zz
  oxistream decompress file.txt.gz -o file.txt
  oxistream decompress -a deflate --max-size 16M data.raw
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// Options shared by both directions.
#[derive(clap::Args)]
struct StreamArgs {
    /// Input file (stdin if omitted or "-")
    input: Option<PathBuf>,

    /// Output file (stdout if omitted or "-")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Framing of the compressed data
    #[arg(short, long, value_enum, default_value = "gzip")]
    algorithm: AlgorithmArg,

    /// History window size as a power of two
    #[arg(short = 'w', long, default_value_t = 15, value_parser = clap::value_parser!(u8).range(9..=15))]
    window_bits: u8,

    /// Bytes read from the input per streaming call (e.g. 16K, 1M)
    #[arg(short = 'c', long, default_value = "16K", value_parser = parse_size)]
    chunk_size: usize,

    /// Show progress bar (file input only)
    #[arg(short = 'P', long)]
    progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress input into a single compressed unit
    #[command(alias = "c")]
    Compress {
        #[command(flatten)]
        args: StreamArgs,
    },

    /// Decompress a single compressed unit
    #[command(alias = "d")]
    Decompress {
        #[command(flatten)]
        args: StreamArgs,

        /// Refuse to produce more than this many bytes (e.g. 256M)
        #[arg(short = 'm', long, default_value = "256M", value_parser = parse_size)]
        max_size: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Raw deflate blocks
    Deflate,
    /// Zlib framing
    Zlib,
    /// Gzip framing
    Gzip,
}

impl From<AlgorithmArg> for Variant {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Deflate => Variant::RawDeflate,
            AlgorithmArg::Zlib => Variant::Zlib,
            AlgorithmArg::Gzip => Variant::Gzip,
        }
    }
}

impl StreamArgs {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::from(Variant::from(self.algorithm)).with_window_bits(self.window_bits)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress { args } => cmd_compress(&args),
        Commands::Decompress { args, max_size } => cmd_decompress(&args, max_size),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG, when set, takes precedence over -v.
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();
    let _ = builder.try_init();
}

/// Opened input with its length when known.
struct Input {
    reader: Box<dyn Read>,
    len: Option<u64>,
}

fn is_stdio(path: Option<&Path>) -> bool {
    path.is_none_or(|p| p.as_os_str() == "-")
}

fn open_input(path: Option<&Path>) -> io::Result<Input> {
    match path {
        Some(path) if !is_stdio(Some(path)) => {
            let file = File::open(path)?;
            let len = file.metadata().ok().map(|m| m.len());
            Ok(Input {
                reader: Box::new(BufReader::new(file)),
                len,
            })
        }
        _ => Ok(Input {
            reader: Box::new(io::stdin().lock()),
            len: None,
        }),
    }
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) if !is_stdio(Some(path)) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        _ => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn cmd_compress(args: &StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let algorithm = args.algorithm();
    let mut input = open_input(args.input.as_deref())?;
    let mut writer = open_output(args.output.as_deref())?;
    let pb = progress_for(&input, args.progress);
    info!("compressing with {algorithm}, {} byte chunks", args.chunk_size);

    let mut compressor = algorithm.compressor();
    compressor.start()?;

    let mut chunk = vec![0u8; args.chunk_size];
    let mut output = BytesMut::with_capacity(compressor.output_bound(args.chunk_size));
    let mut total_out = 0u64;

    loop {
        let n = read_chunk(&mut input.reader, &mut chunk)?;
        let finalise = n < chunk.len();
        let mut data: &[u8] = &chunk[..n];
        total_out += compress_chunk(&mut compressor, &mut data, &mut output, finalise, &mut writer)?;
        pb.inc(n as u64);
        if finalise {
            break;
        }
    }
    compressor.finish()?;
    writer.flush()?;
    pb.finish_and_clear();

    let total_in = compressor.total_in();
    info!(
        "{total_in} -> {total_out} bytes ({:.1}% saved)",
        space_savings(total_in, total_out)
    );
    Ok(())
}

/// Feed one chunk to the compressor, growing the output on overflow.
///
/// Returns the number of compressed bytes written.
fn compress_chunk(
    compressor: &mut Compressor,
    data: &mut &[u8],
    output: &mut BytesMut,
    finalise: bool,
    writer: &mut dyn Write,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut written = 0u64;
    loop {
        let bound = compressor.output_bound(data.len());
        if output.capacity() < bound {
            output.reserve(bound);
        }
        let result = compressor.compress_stream(data, output, finalise);

        // Bytes produced before an overflow are final; write them out either way.
        written += output.len() as u64;
        writer.write_all(&output[..])?;
        output.clear();

        match result {
            Ok(()) => return Ok(written),
            Err(StreamError::BufferOverflow) => {
                debug!("compression overflow, retrying with {} input bytes left", data.len());
                output.reserve(output.capacity().max(1024) * 2);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn cmd_decompress(args: &StreamArgs, max_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let algorithm = args.algorithm();
    let mut input = open_input(args.input.as_deref())?;
    let mut writer = open_output(args.output.as_deref())?;
    let pb = progress_for(&input, args.progress);
    info!("decompressing {algorithm}, {} byte chunks", args.chunk_size);

    let mut decompressor = algorithm.decompressor();
    decompressor.start()?;

    let mut chunk = vec![0u8; args.chunk_size];
    let mut output = BytesMut::with_capacity(args.chunk_size.saturating_mul(4));
    let mut ended = false;

    loop {
        let n = read_chunk(&mut input.reader, &mut chunk)?;
        if n == 0 {
            break;
        }
        pb.inc(n as u64);
        if ended {
            return Err(StreamError::corrupt("trailing data after the end of the stream").into());
        }

        let mut data: &[u8] = &chunk[..n];
        let status = decompress_chunk(&mut decompressor, &mut data, &mut output, max_size, &mut writer)?;
        if status == StepStatus::StreamEnd {
            ended = true;
            if !data.is_empty() {
                return Err(StreamError::corrupt(format!(
                    "{} trailing bytes after the end of the stream",
                    data.len()
                ))
                .into());
            }
        }
    }
    decompressor.finish()?;
    writer.flush()?;
    pb.finish_and_clear();

    info!(
        "{} -> {} bytes",
        decompressor.total_in(),
        decompressor.total_out()
    );
    Ok(())
}

/// Feed one chunk to the decompressor, draining the output on every overflow.
fn decompress_chunk(
    decompressor: &mut Decompressor,
    data: &mut &[u8],
    output: &mut BytesMut,
    max_size: usize,
    writer: &mut dyn Write,
) -> Result<StepStatus, Box<dyn std::error::Error>> {
    loop {
        let result = decompressor.decompress_stream(data, output);

        if decompressor.total_out() > max_size as u64 {
            return Err(StreamError::max_size(max_size).into());
        }
        writer.write_all(&output[..])?;
        output.clear();

        match result {
            Err(StreamError::BufferOverflow) => {
                debug!("decompression overflow, draining output and retrying");
            }
            other => return Ok(other?),
        }
    }
}

fn progress_for(input: &Input, enable: bool) -> ProgressBar {
    match input.len {
        Some(len) => create_progress_bar(len, enable),
        None => create_progress_bar(0, false),
    }
}
