//! Command line front end: `ppmc compress|decompress INPUT OUTPUT [MODEL_ORDER]`

use std::fs::File;
use std::process::ExitCode;

use anyhow::{bail, Context};
use ppm_compress::{compress_to, decompress_from, CodecConfig};

fn run(args: &[String]) -> anyhow::Result<()> {
    let (mode, input, output) = match args {
        [mode, input, output] | [mode, input, output, _] => (mode, input, output),
        _ => bail!("usage: ppmc compress|decompress INPUT OUTPUT [MODEL_ORDER]"),
    };

    let config = match args.get(3) {
        Some(order) => {
            let order = order
                .parse()
                .with_context(|| format!("invalid model order {order:?}"))?;
            CodecConfig::with_order(order)?
        }
        None => CodecConfig::default(),
    };

    let compressing = match mode.as_str() {
        "compress" => true,
        "decompress" => false,
        other => bail!("unknown mode {other:?}, expected compress or decompress"),
    };

    let reader = File::open(input).with_context(|| format!("cannot open {input}"))?;
    let writer = File::create(output).with_context(|| format!("cannot create {output}"))?;

    if compressing {
        compress_to(reader, writer, &config).with_context(|| format!("compressing {input}"))?;
    } else {
        decompress_from(reader, writer, &config)
            .with_context(|| format!("decompressing {input}"))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ppmc: {err:#}");
            ExitCode::FAILURE
        }
    }
}
