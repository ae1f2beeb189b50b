//! multires: aggregate genomic data files into multi-resolution artifacts.
//!
//! Usage: multires aggregate <COMMAND> [OPTIONS] FILEPATH

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use multires_genomics::adapters::bedgraph::{BedGraphConfig, Transform};
use multires_genomics::adapters::bedlike::{IntervalReaderConfig, PairReaderConfig};
use multires_genomics::adapters::open_text_input;
use multires_genomics::adapters::signal::BigWigSource;
use multires_genomics::assembly::{Assembly, AssemblyProvider, BuiltinAssemblies};
use multires_genomics::commands::{
    BedfileCommand, BedgraphCommand, BedpeCommand, BigwigCommand, Method,
};
use multires_genomics::entry::ImportanceRule;
use multires_genomics::error::{AggregateError, Result};

#[derive(Parser)]
#[command(name = "multires")]
#[command(version)]
#[command(about = "Aggregate genomic data files into multi-resolution, tiled artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a data file so that it stores the data at multiple resolutions
    #[command(subcommand)]
    Aggregate(AggregateCommands),
}

#[derive(Subcommand)]
enum AggregateCommands {
    /// Aggregate a bigWig signal file into a dense pyramid
    Bigwig {
        /// Input bigWig file
        filepath: PathBuf,

        /// Output file (default: replace the extension with .hitile)
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// The genome assembly this file was created against
        #[arg(short = 'a', long, default_value = "hg19")]
        assembly: String,

        /// Only extract values for a particular chromosome
        #[arg(long)]
        chromosome: Option<String>,

        /// The number of data points in each tile
        #[arg(short = 't', long, default_value_t = 1024)]
        tile_size: i64,

        /// How many values to aggregate at once, as a power-of-two
        /// multiplier of the tile size
        #[arg(short = 'c', long, default_value_t = 14)]
        chunk_size: u32,

        /// A file containing chromosome sizes and order
        #[arg(long)]
        chromsizes_filename: Option<PathBuf>,

        /// The number of intermediate aggregation levels to omit
        #[arg(short = 'z', long, default_value_t = 8)]
        zoom_step: u32,
    },

    /// Aggregate interval-value text (bedgraph) into a dense pyramid
    Bedgraph {
        /// Input file (use - for stdin; .gz inputs are decompressed)
        filepath: PathBuf,

        /// Output file (default: replace the extension with .hitile)
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// The genome assembly this file was created against
        #[arg(short = 'a', long, default_value = "hg19")]
        assembly: String,

        /// The column number (1-based) which contains the chromosome name
        #[arg(long, default_value_t = 1)]
        chromosome_col: usize,

        /// The column number (1-based) which contains the starting position
        #[arg(long, default_value_t = 2)]
        from_pos_col: usize,

        /// The column number (1-based) which contains the ending position
        #[arg(long, default_value_t = 3)]
        to_pos_col: usize,

        /// The column number (1-based) which contains the value
        #[arg(long, default_value_t = 4)]
        value_col: usize,

        /// Does this file have a header that we should ignore
        #[arg(long, overrides_with = "no_header")]
        has_header: bool,

        #[arg(long, overrides_with = "has_header", hide = true)]
        no_header: bool,

        /// Only extract values for a particular chromosome
        #[arg(long)]
        chromosome: Option<String>,

        /// The number of data points in each tile
        #[arg(short = 't', long, default_value_t = 1024)]
        tile_size: i64,

        /// How many values to aggregate at once, as a power-of-two
        /// multiplier of the tile size
        #[arg(short = 'c', long, default_value_t = 14)]
        chunk_size: u32,

        /// The method used to aggregate values
        #[arg(long, default_value = "sum", value_parser = ["sum", "average"])]
        method: String,

        /// The string to interpret as NaN in the value column
        #[arg(long)]
        nan_value: Option<String>,

        /// A transform to apply to parsed values
        #[arg(long, default_value = "none", value_parser = ["none", "exp2"])]
        transform: String,

        /// A file containing chromosome sizes and order
        #[arg(long)]
        chromsizes_filename: Option<PathBuf>,

        /// The number of intermediate aggregation levels to omit
        #[arg(short = 'z', long, default_value_t = 8)]
        zoom_step: u32,
    },

    /// Aggregate a BED file of ranked intervals
    Bedfile {
        /// Input file (.gz inputs are decompressed)
        filepath: PathBuf,

        /// Output file (default: append .multires)
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// The genome assembly this file was created against
        #[arg(short = 'a', long, default_value = "hg19")]
        assembly: String,

        /// The column (1-based) containing the importance of a row; absent
        /// means the span, the literal `random` means a uniform draw
        #[arg(long)]
        importance_column: Option<String>,

        /// Does this file have a header that we should ignore
        #[arg(long, overrides_with = "no_header")]
        has_header: bool,

        #[arg(long, overrides_with = "has_header", hide = true)]
        no_header: bool,

        /// Only extract values for a particular chromosome
        #[arg(long)]
        chromosome: Option<String>,

        /// The maximum number of entries per tile at each zoom level
        #[arg(long, default_value_t = 100)]
        max_per_tile: usize,

        /// The number of nucleotides the highest-resolution tiles span
        #[arg(short = 't', long, default_value_t = 1024)]
        tile_size: i64,

        /// Split fields on this character instead of any whitespace
        #[arg(long)]
        delimiter: Option<char>,

        /// A file containing chromosome sizes and order
        #[arg(long)]
        chromsizes_filename: Option<PathBuf>,

        /// Apply an offset to all the coordinates in this file
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Aggregate a BEDPE file of ranked interval pairs
    Bedpe {
        /// Input file (.gz inputs are decompressed)
        filepath: PathBuf,

        /// Output file (default: append .multires.db)
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// The genome assembly this file was created against
        #[arg(short = 'a', long, default_value = "hg19")]
        assembly: String,

        /// The column (1-based) containing the importance of a row; the
        /// literal `random` means a uniform draw
        #[arg(long, default_value = "random")]
        importance_column: String,

        /// Does this file have a header that we should ignore
        #[arg(long, overrides_with = "no_header")]
        has_header: bool,

        #[arg(long, overrides_with = "has_header", hide = true)]
        no_header: bool,

        /// The maximum number of entries per tile at each zoom level
        #[arg(long, default_value_t = 100)]
        max_per_tile: u32,

        /// The number of nucleotides the highest-resolution tiles span
        #[arg(short = 't', long, default_value_t = 1024)]
        tile_size: i64,

        /// The column containing the first chromosome
        #[arg(long, default_value_t = 1)]
        chr1_col: usize,

        /// The column containing the first start position
        #[arg(long, default_value_t = 2)]
        from1_col: usize,

        /// The column containing the first end position
        #[arg(long, default_value_t = 3)]
        to1_col: usize,

        /// The column containing the second chromosome
        #[arg(long, default_value_t = 4)]
        chr2_col: usize,

        /// The column containing the second start position
        #[arg(long, default_value_t = 5)]
        from2_col: usize,

        /// The column containing the second end position
        #[arg(long, default_value_t = 6)]
        to2_col: usize,

        /// A file containing chromosome sizes and order
        #[arg(long)]
        chromsizes_filename: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Aggregate(cmd) => match cmd {
            AggregateCommands::Bigwig {
                filepath,
                output_file,
                assembly,
                chromosome,
                tile_size,
                chunk_size,
                chromsizes_filename,
                zoom_step,
            } => run_bigwig(
                filepath,
                output_file,
                assembly,
                chromosome,
                tile_size,
                chunk_size,
                chromsizes_filename,
                zoom_step,
            ),

            AggregateCommands::Bedgraph {
                filepath,
                output_file,
                assembly,
                chromosome_col,
                from_pos_col,
                to_pos_col,
                value_col,
                has_header,
                no_header: _,
                chromosome,
                tile_size,
                chunk_size,
                method,
                nan_value,
                transform,
                chromsizes_filename,
                zoom_step,
            } => run_bedgraph(
                filepath,
                output_file,
                assembly,
                chromosome_col,
                from_pos_col,
                to_pos_col,
                value_col,
                has_header,
                chromosome,
                tile_size,
                chunk_size,
                method,
                nan_value,
                transform,
                chromsizes_filename,
                zoom_step,
            ),

            AggregateCommands::Bedfile {
                filepath,
                output_file,
                assembly,
                importance_column,
                has_header,
                no_header: _,
                chromosome,
                max_per_tile,
                tile_size,
                delimiter,
                chromsizes_filename,
                offset,
            } => run_bedfile(
                filepath,
                output_file,
                assembly,
                importance_column,
                has_header,
                chromosome,
                max_per_tile,
                tile_size,
                delimiter,
                chromsizes_filename,
                offset,
            ),

            AggregateCommands::Bedpe {
                filepath,
                output_file,
                assembly,
                importance_column,
                has_header,
                no_header: _,
                max_per_tile,
                tile_size,
                chr1_col,
                from1_col,
                to1_col,
                chr2_col,
                from2_col,
                to2_col,
                chromsizes_filename,
            } => run_bedpe(
                filepath,
                output_file,
                assembly,
                importance_column,
                has_header,
                max_per_tile,
                tile_size,
                [chr1_col, from1_col, to1_col, chr2_col, from2_col, to2_col],
                chromsizes_filename,
            ),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn resolve_assembly(name: &str, chromsizes: Option<&Path>) -> Result<Assembly> {
    match chromsizes {
        Some(path) => Assembly::from_chromsizes_file(name, path),
        None => BuiltinAssemblies.assembly(name),
    }
}

fn to_zero_based(col: usize, flag: &str) -> Result<usize> {
    if col == 0 {
        return Err(AggregateError::Unsupported(format!(
            "{} is 1-based; 0 is not a valid column",
            flag
        )));
    }
    Ok(col - 1)
}

/// Dense outputs replace the input extension with `.hitile`, inserting the
/// chromosome name for restricted runs.
fn default_dense_output(input: &Path, chromosome: Option<&str>) -> PathBuf {
    match chromosome {
        Some(chrom) => input.with_extension(format!("{}.hitile", chrom)),
        None => input.with_extension("hitile"),
    }
}

/// Sparse outputs append a suffix to the full input path.
fn appended_output(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn run_bigwig(
    filepath: PathBuf,
    output_file: Option<PathBuf>,
    assembly_name: String,
    chromosome: Option<String>,
    tile_size: i64,
    chunk_size: u32,
    chromsizes_filename: Option<PathBuf>,
    zoom_step: u32,
) -> Result<()> {
    let assembly = resolve_assembly(&assembly_name, chromsizes_filename.as_deref())?;
    let output = output_file
        .unwrap_or_else(|| default_dense_output(&filepath, chromosome.as_deref()));

    let mut source = BigWigSource::open(&filepath)?;
    let cmd = BigwigCommand {
        tile_size,
        chunk_shift: chunk_size,
        zoom_step,
        chromosome,
    };
    cmd.run(&mut source, &assembly, &output)?;
    eprintln!("wrote {}", output.display());
    Ok(())
}

fn run_bedgraph(
    filepath: PathBuf,
    output_file: Option<PathBuf>,
    assembly_name: String,
    chromosome_col: usize,
    from_pos_col: usize,
    to_pos_col: usize,
    value_col: usize,
    has_header: bool,
    chromosome: Option<String>,
    tile_size: i64,
    chunk_size: u32,
    method: String,
    nan_value: Option<String>,
    transform: String,
    chromsizes_filename: Option<PathBuf>,
    zoom_step: u32,
) -> Result<()> {
    let assembly = resolve_assembly(&assembly_name, chromsizes_filename.as_deref())?;
    let output = output_file
        .unwrap_or_else(|| default_dense_output(&filepath, chromosome.as_deref()));

    let config = BedGraphConfig {
        chrom_col: to_zero_based(chromosome_col, "--chromosome-col")?,
        from_col: to_zero_based(from_pos_col, "--from-pos-col")?,
        to_col: to_zero_based(to_pos_col, "--to-pos-col")?,
        value_col: to_zero_based(value_col, "--value-col")?,
        has_header,
        nan_value,
        transform: match transform.as_str() {
            "exp2" => Transform::Exp2,
            _ => Transform::None,
        },
        chromosome,
    };
    let cmd = BedgraphCommand {
        config,
        method: match method.as_str() {
            "average" => Method::Average,
            _ => Method::Sum,
        },
        tile_size,
        chunk_shift: chunk_size,
        zoom_step,
    };

    let reader = open_text_input(&filepath)?;
    cmd.run(reader, &assembly, &output)?;
    eprintln!("wrote {}", output.display());
    Ok(())
}

fn run_bedfile(
    filepath: PathBuf,
    output_file: Option<PathBuf>,
    assembly_name: String,
    importance_column: Option<String>,
    has_header: bool,
    chromosome: Option<String>,
    max_per_tile: usize,
    tile_size: i64,
    delimiter: Option<char>,
    chromsizes_filename: Option<PathBuf>,
    offset: i64,
) -> Result<()> {
    let assembly = resolve_assembly(&assembly_name, chromsizes_filename.as_deref())?;
    let output = output_file.unwrap_or_else(|| appended_output(&filepath, ".multires"));

    let cmd = BedfileCommand {
        reader_config: IntervalReaderConfig {
            importance: ImportanceRule::parse(importance_column.as_deref())?,
            has_header,
            chromosome,
            delimiter,
            offset,
        },
        max_per_tile,
        tile_size,
    };

    let reader = open_text_input(&filepath)?;
    let summary = cmd.run(reader, &assembly, &output)?;
    eprintln!(
        "wrote {} ({} entries placed, {} dropped)",
        output.display(),
        summary.placed,
        summary.dropped
    );
    Ok(())
}

fn run_bedpe(
    filepath: PathBuf,
    output_file: Option<PathBuf>,
    assembly_name: String,
    importance_column: String,
    has_header: bool,
    max_per_tile: u32,
    tile_size: i64,
    columns: [usize; 6],
    chromsizes_filename: Option<PathBuf>,
) -> Result<()> {
    let assembly = resolve_assembly(&assembly_name, chromsizes_filename.as_deref())?;
    let output = output_file.unwrap_or_else(|| appended_output(&filepath, ".multires.db"));

    let cmd = BedpeCommand {
        reader_config: PairReaderConfig {
            chr1_col: to_zero_based(columns[0], "--chr1-col")?,
            from1_col: to_zero_based(columns[1], "--from1-col")?,
            to1_col: to_zero_based(columns[2], "--to1-col")?,
            chr2_col: to_zero_based(columns[3], "--chr2-col")?,
            from2_col: to_zero_based(columns[4], "--from2-col")?,
            to2_col: to_zero_based(columns[5], "--to2-col")?,
            importance: ImportanceRule::parse(Some(&importance_column))?,
            has_header,
        },
        max_per_tile,
        tile_size,
    };

    let reader = open_text_input(&filepath)?;
    let summary = cmd.run(reader, &assembly, &output)?;
    eprintln!(
        "wrote {} ({} entries placed, {} dropped)",
        output.display(),
        summary.placed,
        summary.dropped
    );
    Ok(())
}
