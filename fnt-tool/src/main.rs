//! Command line front end for fnt-bridge.
//!
//! Converts a BMFont descriptor and its PNG pages into a TrueType font, or
//! renders a TrueType/OpenType font into a descriptor and PNG pages.

use std::path::{Path, PathBuf};

use clap::Parser;
use fnt_bridge::{
    ttf_file_name, AtlasOptions, CharacterSetSelection, FntToTtf, OutlineSource, SkrifaSource,
    TtfToFnt, CHARACTER_SETS, DEFAULT_SPACING,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Trace a .fnt file and its PNG pages into a TrueType font
    FntToTtf {
        /// The .fnt descriptor
        fnt: PathBuf,
        /// Directory holding the page images (defaults to the directory of the .fnt file)
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        /// Family name of the generated font (defaults to the .fnt file stem)
        #[arg(long)]
        name: Option<String>,
        /// The output font file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        sets: SetArgs,
    },
    /// Render a TrueType or OpenType font into a .fnt file and PNG pages
    TtfToFnt {
        /// The input font file
        font: PathBuf,
        /// Base name of the generated files (defaults to the font's family name)
        #[arg(long)]
        name: Option<String>,
        /// Pixels per em
        #[arg(long, default_value_t = 64)]
        size: u32,
        /// Width of each atlas page
        #[arg(long, default_value_t = 1024)]
        width: u32,
        /// Height of each atlas page
        #[arg(long, default_value_t = 1024)]
        height: u32,
        /// Margin between cells and around the page edge
        #[arg(long, default_value_t = DEFAULT_SPACING)]
        spacing: u32,
        /// The output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[command(flatten)]
        sets: SetArgs,
    },
    /// List the character sets that can be selected
    ListSets,
}

#[derive(clap::Args, Debug)]
struct SetArgs {
    /// Leave out a character set (repeatable)
    #[arg(long = "exclude-set", value_name = "NAME")]
    exclude: Vec<String>,
    /// Only include the given character sets (repeatable)
    #[arg(long = "only-set", value_name = "NAME", conflicts_with = "exclude")]
    only: Vec<String>,
}

impl SetArgs {
    fn apply(&self, selection: &mut CharacterSetSelection) -> Result<(), String> {
        if !self.only.is_empty() {
            *selection = CharacterSetSelection::none();
        }
        let changes = self
            .only
            .iter()
            .map(|name| (name, true))
            .chain(self.exclude.iter().map(|name| (name, false)));
        for (name, enabled) in changes {
            if !selection.set_enabled(name, enabled) {
                return Err(format!(
                    "unknown character set '{name}' (see `fnt-tool list-sets`)"
                ));
            }
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let result = match args.command {
        Command::FntToTtf {
            fnt,
            pages_dir,
            name,
            output,
            sets,
        } => fnt_to_ttf(&fnt, pages_dir, name, output, &sets),
        Command::TtfToFnt {
            font,
            name,
            size,
            width,
            height,
            spacing,
            output,
            sets,
        } => {
            let options = AtlasOptions {
                font_size: size,
                atlas_width: width,
                atlas_height: height,
                spacing,
                ..Default::default()
            };
            ttf_to_fnt(&font, name, &options, &output, &sets)
        }
        Command::ListSets => {
            for set in CHARACTER_SETS {
                println!("{:<22}{} characters", set.name, set.chars().count());
            }
            Ok(())
        }
    };
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn fnt_to_ttf(
    fnt_path: &Path,
    pages_dir: Option<PathBuf>,
    name: Option<String>,
    output: Option<PathBuf>,
    sets: &SetArgs,
) -> Result<(), String> {
    let text = read_to_string(fnt_path)?;
    let name = name.unwrap_or_else(|| file_stem(fnt_path));
    let pages_dir = pages_dir
        .or_else(|| fnt_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let mut driver = FntToTtf::new();
    sets.apply(driver.selection_mut())?;
    driver.load_fnt(&name, &text).map_err(|e| e.to_string())?;
    let pages = driver
        .missing_pages()
        .into_iter()
        .map(|file| Ok((file.to_owned(), read(&pages_dir.join(file))?)))
        .collect::<Result<Vec<_>, String>>()?;
    driver.attach_png_pages(pages).map_err(|e| e.to_string())?;
    log::info!("including {:?}", driver.included_characters());
    let font = driver.generate().map_err(|e| e.to_string())?;
    let bytes = font.to_ttf().map_err(|e| e.to_string())?;

    let output = output.unwrap_or_else(|| PathBuf::from(ttf_file_name(&name)));
    write(&output, &bytes)?;
    println!(
        "wrote {} ({} glyphs)",
        output.display(),
        font.glyphs.len()
    );
    Ok(())
}

fn ttf_to_fnt(
    font_path: &Path,
    name: Option<String>,
    options: &AtlasOptions,
    out_dir: &Path,
    sets: &SetArgs,
) -> Result<(), String> {
    let source = SkrifaSource::new(read(font_path)?).map_err(|e| e.to_string())?;
    let name = name
        .or_else(|| Some(source.family_name()).filter(|name| !name.is_empty()))
        .unwrap_or_else(|| file_stem(font_path));

    let mut driver = TtfToFnt::<SkrifaSource>::new();
    sets.apply(driver.selection_mut())?;
    driver.set_project_name(name);
    driver.load(source);
    let preview = driver.resolve_glyphs().map_err(|e| e.to_string())?;
    log::info!("including {preview:?}");
    let bitmap = driver.generate(options).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("could not create {}: {e}", out_dir.display()))?;
    let fnt_path = out_dir.join(bitmap.fnt_file_name());
    write(&fnt_path, bitmap.to_fnt_string().as_bytes())?;
    for (file, png) in bitmap.encode_pages().map_err(|e| e.to_string())? {
        write(&out_dir.join(file), &png)?;
    }
    println!(
        "wrote {} ({} chars on {} pages)",
        fnt_path.display(),
        bitmap.descriptor.chars.len(),
        bitmap.pages.len()
    );
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("could not read {}: {e}", path.display()))
}

fn read_to_string(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("could not read {}: {e}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), String> {
    std::fs::write(path, bytes).map_err(|e| format!("could not write {}: {e}", path.display()))
}
