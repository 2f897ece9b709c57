use std::env;
use std::fs;

use fsbinder::{Binder, Result, sniff};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: list <binder> [data]");
        return Ok(());
    };

    let bytes = fs::read(&path)?;
    let binder = match (sniff(&bytes), args.next()) {
        (Some(kind), Some(data)) if kind.is_split() => Binder::read_split(&bytes, &fs::read(data)?)?,
        _ => Binder::read(&bytes)?,
    };

    println!("{path}: {} format {}", binder.kind(), binder.format());
    for file in binder.files() {
        let id = file.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "{id:>8}  {:>10}  {}",
            file.len(),
            file.name.as_deref().unwrap_or("<unnamed>")
        );
    }

    Ok(())
}
