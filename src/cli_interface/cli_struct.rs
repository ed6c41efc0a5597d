use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum EcsFsCli {
    /// create a new file system
    Mkfs(MkfsArgs),
    /// show the layout and usage of a file system
    Info(ImageArgs),
    /// list the files of a file system
    Ls(ImageArgs),
    /// copy a host file into a file system
    Add(AddArgs),
    /// print a file to standard output
    Cat(FileArgs),
    /// delete a file
    Rm(FileArgs),
    /// show the size of a file
    Stat(FileArgs),
}
///make a new fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new file system")]
pub struct MkfsArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the number of data blocks of the file system
    #[clap(short = 'n', long)]
    pub data_blocks: u16,
}

/// subcommands working on a whole image
#[derive(clap::Args, Debug, PartialEq)]
pub struct ImageArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

/// subcommands working on one file of an image
#[derive(clap::Args, Debug, PartialEq)]
pub struct FileArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the name of the file inside the file system
    #[clap(short, long)]
    pub name: String,
}

#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "copy a host file into a file system")]
pub struct AddArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the host file to copy
    #[clap(short = 'f', long)]
    pub host_file: String,
    /// the name inside the file system, defaults to the host file name
    #[clap(short, long)]
    pub name: Option<String>,
}

/// test the `EcsFsCli` struct
/// test `mkfs` subcommand
#[cfg(test)]
mod mkfs_parse_args_tests {
    use super::*;
    /// test short parameter form
    #[test]
    fn test_short_parameter_form() {
        let args = EcsFsCli::parse_from(["ecsfs", "mkfs", "-p", "test", "-n", "8192"]);
        assert_eq!(
            args,
            EcsFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                data_blocks: 8192,
            })
        );
    }
    /// test long parameter form
    #[test]
    fn test_long_parameter_form() {
        let image_file_path_name = concat!("--", "image-file-path");
        let args = EcsFsCli::parse_from([
            "ecsfs",
            "mkfs",
            image_file_path_name,
            "test",
            "--data-blocks",
            "100",
        ]);
        assert_eq!(
            args,
            EcsFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                data_blocks: 100,
            })
        );
    }
    /// more data blocks than a 16-bit field holds
    #[test]
    fn test_too_many_data_blocks() {
        assert!(EcsFsCli::try_parse_from(["ecsfs", "mkfs", "-p", "test", "-n", "70000"]).is_err());
    }
}

/// test the file subcommands
#[cfg(test)]
mod file_parse_args_tests {
    use super::*;
    #[test]
    fn test_add_with_and_without_name() {
        let args = EcsFsCli::parse_from(["ecsfs", "add", "-p", "disk.img", "-f", "/etc/hosts"]);
        assert_eq!(
            args,
            EcsFsCli::Add(AddArgs {
                image_file_path: "disk.img".to_string(),
                host_file: "/etc/hosts".to_string(),
                name: None,
            })
        );
        let args = EcsFsCli::parse_from([
            "ecsfs", "add", "-p", "disk.img", "-f", "/etc/hosts", "--name", "hosts",
        ]);
        assert_eq!(
            args,
            EcsFsCli::Add(AddArgs {
                image_file_path: "disk.img".to_string(),
                host_file: "/etc/hosts".to_string(),
                name: Some("hosts".to_string()),
            })
        );
    }

    #[test]
    fn test_file_subcommands() {
        let expected = FileArgs {
            image_file_path: "disk.img".to_string(),
            name: "a".to_string(),
        };
        let args = EcsFsCli::parse_from(["ecsfs", "cat", "-p", "disk.img", "-n", "a"]);
        assert_eq!(args, EcsFsCli::Cat(expected));
        let args = EcsFsCli::parse_from(["ecsfs", "ls", "--image-file-path", "disk.img"]);
        assert_eq!(
            args,
            EcsFsCli::Ls(ImageArgs {
                image_file_path: "disk.img".to_string(),
            })
        );
        assert!(EcsFsCli::try_parse_from(["ecsfs", "rm", "-p", "disk.img"]).is_err());
    }
}
