//! Command-line demo for `radix-arena`. Each invocation loads an arena file
//! from disk, performs one operation, and writes the (possibly grown)
//! buffer back — a crude but honest way to show that the arena is just
//! bytes: nothing about it depends on staying resident in one process.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use radix_arena::{BitKey, Checkpoint, Tree};

#[derive(Parser, Debug)]
#[command(about = "Inspect and mutate a radix-arena file from the shell", long_about = None)]
struct Cli {
    /// Path to the arena file. Created (zero-filled) if it doesn't exist.
    #[arg(long, default_value = "radix.arena")]
    file: PathBuf,

    /// Size to allocate when creating a new arena file.
    #[arg(long, default_value_t = 1 << 20)]
    size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert or update a key's value.
    Insert { key: String, value: String },
    /// Look up a key's current value.
    Get { key: String },
    /// Logically remove a key.
    Remove { key: String },
    /// List every live key in lexicographic order.
    List,
    /// Print the arena's current append watermark.
    Checkpoint,
    /// Roll the arena back to a previously-printed watermark.
    Restore { watermark: u64 },
    /// Print how many bytes of the arena are in use.
    Usage,
}

fn load_or_create(path: &PathBuf, size: usize) -> std::io::Result<Vec<u8>> {
    match fs::read(path) {
        Ok(buf) => Ok(buf),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("creating new {size}-byte arena at {}", path.display());
            let mut buf = vec![0u8; size];
            let mut tree = Tree::create(&mut buf);
            tree.clear().expect("fresh buffer always has room for Meta");
            Ok(buf)
        }
        Err(e) => Err(e),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut buf = load_or_create(&cli.file, cli.size)?;
    let mut tree = Tree::create(&mut buf);
    let root = tree.iterator();

    match cli.command {
        Command::Insert { key, value } => {
            tree.insert(root, BitKey::from_bytes(key.as_bytes()), value.as_bytes())?;
            log::debug!("inserted {key:?} ({} bytes)", value.len());
        }
        Command::Get { key } => {
            let found = tree.match_(root, BitKey::from_bytes(key.as_bytes()));
            if found.is_empty() {
                println!("(not found)");
            } else {
                println!("{}", String::from_utf8_lossy(found.data));
            }
        }
        Command::Remove { key } => {
            tree.remove(root, BitKey::from_bytes(key.as_bytes()))?;
            log::debug!("removed {key:?}");
        }
        Command::List => {
            let mut cur = root;
            loop {
                let found = tree.next(cur);
                if found.is_empty() {
                    break;
                }
                let node = found.to_node_ref();
                let bits = tree.key_bits(node);
                let mut key_buf = vec![0u8; ((bits + 7) / 8) as usize];
                tree.key_copy(node, &mut key_buf, bits)?;
                println!("{}\t{}", String::from_utf8_lossy(&key_buf), String::from_utf8_lossy(found.data));
                cur = node;
            }
        }
        Command::Checkpoint => {
            println!("{}", tree.checkpoint().state());
        }
        Command::Restore { watermark } => {
            tree.checkpoint_restore(Checkpoint::from_state(watermark));
        }
        Command::Usage => {
            println!("{}", tree.memory_usage());
        }
    }

    fs::write(&cli.file, &buf)?;
    Ok(())
}
