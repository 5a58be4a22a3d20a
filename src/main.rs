use std::{env, error, process};

use memini::calibration::Calibration;
use memini::{IniFile, Value};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn error::Error>> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or("expected path as first argument")?;
    let ini = IniFile::from_file(&path)?;

    if args.next().as_deref() == Some("--calibration") {
        println!("{:#?}", Calibration::from_ini(&ini));
        return Ok(());
    }

    for section in ini.sections() {
        println!("[{}]", section.name());

        for entry in section.entries() {
            match entry.value() {
                Value::Scalar(value) => println!("{} = \"{value}\"", entry.name()),
                Value::List(values) => println!(
                    "{} = {}",
                    entry.name(),
                    values
                        .iter()
                        .map(|v| format!("\"{v}\""))
                        .collect::<Vec<String>>()
                        .join(",")
                ),
            }
        }

        println!();
    }

    Ok(())
}
