// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::{Context, Result},
    clap::Parser,
    log::LevelFilter,
    resign::{driver, ipa_archive, CliSignAsset, CodesignCliSigner},
    std::path::{Path, PathBuf},
};

/// Re-sign an iOS/macOS application bundle in place.
#[derive(Parser, Debug)]
#[command(name = "resign", version, about)]
struct Args {
    /// Path to the `.app`/`.ipa` payload directory, or an `.ipa` archive.
    bundle: PathBuf,

    /// Replace CFBundleIdentifier at the root, propagating to plugins.
    #[arg(long = "bundle-id")]
    bundle_id: Option<String>,

    /// Replace CFBundleVersion and CFBundleShortVersionString.
    #[arg(long)]
    bundle_version: Option<String>,

    /// Replace CFBundleName and CFBundleDisplayName.
    #[arg(long)]
    display_name: Option<String>,

    /// A loose `.dylib` to copy into the bundle root and inject into the
    /// main executable's load commands. May be given more than once.
    #[arg(long = "inject", value_name = "DYLIB")]
    inject_dylibs: Vec<PathBuf>,

    /// Mark injected dylibs as weakly linked.
    #[arg(long)]
    weak_inject: bool,

    /// Signing identity team id, passed through to the signer.
    #[arg(long, default_value = "")]
    team_id: String,

    /// Signing identity common name, e.g. "iPhone Distribution: Example".
    #[arg(long)]
    subject_cn: String,

    /// Embed this provisioning profile instead of removing the existing one.
    #[arg(long)]
    provisioning_profile: Option<PathBuf>,

    /// Re-sign everything, ignoring the cached signing plan.
    #[arg(short, long)]
    force: bool,

    /// Don't read or write the on-disk signing plan cache.
    #[arg(long)]
    no_cache: bool,

    /// Increase logging verbosity. May be given more than once.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main_impl() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let provisioning_profile = args
        .provisioning_profile
        .as_ref()
        .map(std::fs::read)
        .transpose()
        .context("reading provisioning profile")?;

    let asset = CliSignAsset {
        team_id: args.team_id,
        subject_cn: args.subject_cn,
        provisioning_profile,
    };
    let signer = CodesignCliSigner;

    let is_ipa = args.bundle.is_file();
    let extraction_dir = is_ipa.then(|| tempfile::tempdir()).transpose()?;
    let start_dir = if let Some(dir) = &extraction_dir {
        ipa_archive::extract(&args.bundle, dir.path()).context("extracting .ipa archive")?
    } else {
        args.bundle.clone()
    };

    let options = driver::SigningOptions {
        start_dir: &start_dir,
        new_bundle_id: args.bundle_id.as_deref(),
        new_version: args.bundle_version.as_deref(),
        new_display_name: args.display_name.as_deref(),
        inject_dylibs: &args.inject_dylibs,
        force: args.force,
        weak_inject: args.weak_inject,
        enable_cache: !args.no_cache,
    };

    driver::run(&options, &asset, &signer, Path::new("."))
        .context("re-signing bundle")?;

    if let Some(dir) = &extraction_dir {
        ipa_archive::repack(dir.path(), &args.bundle).context("repacking .ipa archive")?;
    }

    Ok(())
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };

    std::process::exit(exit_code);
}
