use clap::Parser;
use ecsfs::{cli_interface::EcsFsCli, FsError};
/// a CLI interface to users to create our filesystem,
/// or to inspect and change the files stored in an image.
///
/// every subcommand mounts the image and unmounts it before exiting,
/// so changes are written back only when the subcommand succeeds in unmounting.
fn main() {
    env_logger::builder().format_timestamp_nanos().init();
    let args = EcsFsCli::parse();
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = ecsfs::commands::run(args, &mut stdout) {
        eprintln!("ecsfs: {e:#}");
        // report the filesystem errno when there is one
        let code = e.downcast_ref::<FsError>().map_or(1, FsError::errno);
        std::process::exit(code);
    }
}
