//! the subcommands of the `ecsfs` tool,
//! each one mounts the image, works on it and unmounts it again
use std::{io::Write, path::Path};

use anyhow::{anyhow, Context};
use byte_unit::Byte;
use log::warn;

use crate::{
    cli_interface::{AddArgs, EcsFsCli, FileArgs, ImageArgs, MkfsArgs},
    fs::FileSystem,
    mkfs::mkfs,
};

/// run one parsed command line, printing results to `out`
pub fn run(args: EcsFsCli, out: &mut impl Write) -> anyhow::Result<()> {
    match args {
        EcsFsCli::Mkfs(MkfsArgs {
            image_file_path,
            data_blocks,
        }) => mkfs(image_file_path, data_blocks),
        EcsFsCli::Info(ImageArgs { image_file_path }) => with_volume(&image_file_path, |fs| {
            writeln!(out, "{}", fs.info()?)?;
            Ok(())
        }),
        EcsFsCli::Ls(ImageArgs { image_file_path }) => with_volume(&image_file_path, |fs| {
            writeln!(out, "FS Ls:")?;
            for file in fs.list()? {
                writeln!(out, "{file}")?;
            }
            Ok(())
        }),
        EcsFsCli::Add(args) => add(args, out),
        EcsFsCli::Cat(FileArgs {
            image_file_path,
            name,
        }) => with_volume(&image_file_path, |fs| {
            let fd = fs.open(&name)?;
            let mut buf = vec![0u8; fs.stat(fd)? as usize];
            let read = fs.read(fd, &mut buf)?;
            fs.close(fd)?;
            out.write_all(&buf[..read])?;
            Ok(())
        }),
        EcsFsCli::Rm(FileArgs {
            image_file_path,
            name,
        }) => with_volume(&image_file_path, |fs| Ok(fs.delete(&name)?)),
        EcsFsCli::Stat(FileArgs {
            image_file_path,
            name,
        }) => with_volume(&image_file_path, |fs| {
            let fd = fs.open(&name)?;
            let size = fs.stat(fd)?;
            fs.close(fd)?;
            writeln!(out, "Size of file '{name}' is {size} bytes")?;
            Ok(())
        }),
    }
}

fn add(args: AddArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let AddArgs {
        image_file_path,
        host_file,
        name,
    } = args;
    let data = std::fs::read(&host_file).with_context(|| format!("can't read {host_file}"))?;
    let name = match name {
        Some(name) => name,
        None => Path::new(&host_file)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("can't derive a file name from {host_file}"))?,
    };
    with_volume(&image_file_path, |fs| {
        fs.create(&name)?;
        let fd = fs.open(&name)?;
        let written = fs.write(fd, &data)?;
        fs.close(fd)?;
        if written < data.len() {
            warn!(
                "disk full: stored only {written} of {} bytes of {host_file}",
                data.len()
            );
        }
        writeln!(
            out,
            "Wrote file '{name}' ({})",
            Byte::from_bytes(written as u128).get_appropriate_unit(true)
        )?;
        Ok(())
    })
}

/// mount `image_file_path`, run `f` and unmount,
/// the volume is unmounted even when `f` fails
fn with_volume<F>(image_file_path: &str, f: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut FileSystem) -> anyhow::Result<()>,
{
    let mut fs: FileSystem = FileSystem::new();
    fs.mount(image_file_path)
        .with_context(|| format!("can't mount {image_file_path}"))?;
    let result = f(&mut fs);
    let unmounted = fs
        .unmount()
        .with_context(|| format!("can't unmount {image_file_path}"));
    result.and(unmounted)
}
