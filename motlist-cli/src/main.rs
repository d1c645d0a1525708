use anyhow::{bail, Context, Result};
use log::*;
use motlist::const_table::known_bone_name;
use motlist::convert::{build_clip, ConvertOptions, Conversion, SampledAnimation};
use motlist::dump::Dump;
use motlist::exchange::ExchangeDocument;
use motlist::inspect::inspect;
use motlist::resolve::{resolve, SkeletonBoneMap};
use motlist::*;
use structopt::StructOpt;

use std::fs;
use std::path::{Path, PathBuf};

mod descriptor;

use descriptor::Config;

#[derive(Debug, StructOpt)]
#[structopt(name = "motlist", about = "builds and checks RE Engine motlist and motbank files")]
struct Opt {
    /// TOML defaults, `./config.toml` when present
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Convert a CAF_AnimData JSON document to a motlist
    Convert {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(parse(from_os_str))]
        output: PathBuf,
        /// Reference motlist for bone index mapping
        #[structopt(long = "ref", parse(from_os_str))]
        reference: Option<PathBuf>,
        /// Store rotations as 12 byte floats
        #[structopt(long)]
        uncompressed: bool,
        /// Motion name, defaults to the document's action name
        #[structopt(long)]
        name: Option<String>,
        #[structopt(long)]
        motlist_name: Option<String>,
        #[structopt(long)]
        no_positions: bool,
        /// Blender Z-up to engine Y-up
        #[structopt(long)]
        axis_convert: bool,
    },
    /// Convert a captured transform dump to a motlist
    ConvertDump {
        #[structopt(parse(from_os_str))]
        dump: PathBuf,
        #[structopt(parse(from_os_str))]
        output: PathBuf,
        #[structopt(long = "ref", parse(from_os_str))]
        reference: Option<PathBuf>,
        #[structopt(long)]
        name: Option<String>,
        #[structopt(long, default_value = "60")]
        fps: u16,
        #[structopt(long)]
        no_positions: bool,
        #[structopt(long)]
        uncompressed: bool,
    },
    /// Check a motlist or motbank and print its structure
    Validate {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
    /// Print the bone hash to skeleton index table of a motlist
    ExtractBones {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
    /// Print the hash of each bone name
    Hash {
        #[structopt(required = true)]
        names: Vec<String>,
    },
    /// Write a motbank registering motlist resource paths
    Bank {
        #[structopt(required = true)]
        motlists: Vec<String>,
        #[structopt(short, long, parse(from_os_str))]
        out: PathBuf,
        /// Id of the first entry; later entries count up from it
        #[structopt(long, default_value = "0")]
        bank_id: u32,
        #[structopt(long, default_value = "0")]
        weapon_id: u32,
        #[structopt(long, default_value = "0", parse(try_from_str = parse_int))]
        layer_mask: u32,
    },
}

fn parse_int(s: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn encoding(uncompressed: bool) -> RotationEncoding {
    if uncompressed {
        RotationEncoding::Uncompressed12Byte
    } else {
        RotationEncoding::Compressed4Byte
    }
}

fn load_reference(path: Option<&Path>) -> Result<Option<SkeletonBoneMap>> {
    let path = match path {
        Some(path) => path,
        None => return Ok(None),
    };
    if !path.exists() {
        warn!("reference `{}` not found, assigning indices sequentially", path.display());
        return Ok(None);
    }
    let data = fs::read(path).with_context(|| format!("failed to open reference `{}`", path.display()))?;
    let map = SkeletonBoneMap::from_motlist(&data)
        .with_context(|| format!("failed to read reference `{}`", path.display()))?;
    info!("reference maps {} bones", map.len());
    Ok(Some(map))
}

/// Resolves indices, builds the clip and writes it as a single-entry motlist.
fn write_motlist(
    config: &Config,
    sampled: &SampledAnimation,
    reference: Option<&Path>,
    options: &ConvertOptions,
    motlist_name: &str,
    output: &Path,
) -> Result<()> {
    let reference = load_reference(reference)?;
    let indices = resolve(&sampled.bones[..], reference.as_ref(), &config.overrides)?;
    let Conversion { clip, quality } = build_clip(sampled, &indices, options)?;
    let summary = format!(
        "{} bones, {} frames @ {}fps, {:?}",
        clip.bones.len(),
        clip.frame_count,
        clip.frame_rate,
        clip.rotation_encoding
    );
    let data = AnimationContainer::new(motlist_name, vec![clip]).encode()?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create `{}`", dir.display()))?;
    }
    fs::write(output, &data).with_context(|| format!("failed to write `{}`", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), data.len());
    println!("  {}", summary);
    if quality.sign_flips > 0 {
        println!("  Fixed {} quaternion sign flips", quality.sign_flips);
    }
    if quality.missing_samples > 0 {
        println!("  {} missing samples set to identity", quality.missing_samples);
    }
    if !quality.skipped_bones.is_empty() {
        println!("  Skipped {}", quality.skipped_bones.join(", "));
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let opt = Opt::from_args();
    let config = Config::load(opt.config.as_deref())?;
    debug!("{:?}", config);

    match opt.cmd {
        Command::Convert {
            input,
            output,
            reference,
            uncompressed,
            name,
            motlist_name,
            no_positions,
            axis_convert,
        } => {
            let file = fs::File::open(&input).with_context(|| format!("failed to open `{}`", input.display()))?;
            let doc = ExchangeDocument::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("failed to load `{}`", input.display()))?;
            let options = ConvertOptions {
                motion_name: name,
                rotation_encoding: encoding(uncompressed || config.uncompressed),
                include_positions: !no_positions,
                axis_convert: axis_convert || config.axis_convert,
                skip_prefixes: config.skip_prefixes.clone().unwrap_or_default(),
            };
            let motlist_name = motlist_name
                .or_else(|| config.motlist_name.clone())
                .unwrap_or_else(|| "custom_anim".to_string());
            let reference = reference.or_else(|| config.reference.clone());
            write_motlist(
                &config,
                &doc.to_sampled(),
                reference.as_deref(),
                &options,
                &motlist_name,
                &output,
            )?;
        }
        Command::ConvertDump {
            dump,
            output,
            reference,
            name,
            fps,
            no_positions,
            uncompressed,
        } => {
            let text = fs::read_to_string(&dump).with_context(|| format!("failed to open `{}`", dump.display()))?;
            let parsed: Dump = text
                .parse()
                .with_context(|| format!("failed to parse `{}`", dump.display()))?;
            let name = name.unwrap_or_else(|| {
                dump.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "dump".to_string())
            });
            info!(
                "dump: {} bones, {} frames (header says {:?})",
                parsed.bones.len(),
                parsed.frame_count(),
                parsed.declared_frame_count
            );
            let sampled = parsed.to_sampled(&name, fps, !no_positions);
            let options = ConvertOptions {
                motion_name: None,
                rotation_encoding: encoding(uncompressed || config.uncompressed),
                include_positions: !no_positions,
                axis_convert: config.axis_convert,
                skip_prefixes: config
                    .skip_prefixes
                    .clone()
                    .unwrap_or_else(ConvertOptions::dump_skip_prefixes),
            };
            let reference = reference.or_else(|| config.reference.clone());
            write_motlist(
                &config,
                &sampled,
                reference.as_deref(),
                &options,
                &sampled.name,
                &output,
            )?;
        }
        Command::Validate { file } => {
            let data = fs::read(&file).with_context(|| format!("failed to open `{}`", file.display()))?;
            let report = inspect(&data);
            println!("{}", report);
            if !report.is_clean() {
                bail!("{} issues found in `{}`", report.anomalies.len(), file.display());
            }
        }
        Command::ExtractBones { file } => {
            let data = fs::read(&file).with_context(|| format!("failed to open `{}`", file.display()))?;
            let map = SkeletonBoneMap::from_motlist(&data)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            println!("Bone mapping ({} bones):", map.len());
            for (hash, index) in map.entries() {
                let name = known_bone_name(hash).unwrap_or("");
                println!("  hash={:#010x} -> index={:3} {}", hash, index, name);
            }
        }
        Command::Hash { names } => {
            for name in names {
                let hash = bone_name_hash(&name);
                println!("{} -> {:#010x} ({})", name, hash, hash);
            }
        }
        Command::Bank {
            motlists,
            out,
            bank_id,
            weapon_id,
            layer_mask,
        } => {
            let entries = motlists
                .into_iter()
                .zip(bank_id..)
                .map(|(motlist_path, bank_id)| BankEntry {
                    motlist_path,
                    bank_id,
                    weapon_id,
                    layer_mask,
                })
                .collect();
            let data = BankContainer { entries }.encode()?;
            fs::write(&out, &data).with_context(|| format!("failed to write `{}`", out.display()))?;
            println!("Wrote {} ({} bytes)", out.display(), data.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_masks() {
        assert_eq!(parse_int("0x10").unwrap(), 16);
        assert_eq!(parse_int("12").unwrap(), 12);
        assert!(parse_int("0xZZ").is_err());
    }

    #[test]
    fn subcommands() {
        let opt = Opt::from_iter(&["motlist", "bank", "a.motlist", "b.motlist", "--out", "x.motbank", "--layer-mask", "0x3"]);
        match opt.cmd {
            Command::Bank { motlists, layer_mask, .. } => {
                assert_eq!(motlists.len(), 2);
                assert_eq!(layer_mask, 3);
            }
            other => panic!("{:?}", other),
        }
        let opt = Opt::from_iter(&["motlist", "convert-dump", "d.txt", "o.motlist", "--fps", "30"]);
        assert!(matches!(opt.cmd, Command::ConvertDump { fps: 30, .. }));
    }
}
