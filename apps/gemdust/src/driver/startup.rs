use super::*;

pub(crate) fn run() -> ExitCode {
    install_logging();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("gemdust startup error: {error}");
            eprintln!("{}", usage());
            return ExitCode::from(2);
        }
    };

    match runtime::drive(&options) {
        Ok(summary) => {
            runtime::print_summary(&options, &summary);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("gemdust: {error}");
            ExitCode::FAILURE
        }
    }
}

fn install_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn usage() -> &'static str {
    "usage: gemdust [URL|PATH] [--width PX] [--height PX] [--scroll PX] [--frames N] [--line-height PX] [--no-smooth]"
}

fn parse_args<I>(args: I) -> Result<DriverOptions, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = DriverOptions::default();
    let mut target = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--width" => options.width = positive(&arg, args.next())?,
            "--height" => options.height = positive(&arg, args.next())?,
            "--line-height" => options.line_height = Some(positive(&arg, args.next())?),
            "--frames" => {
                let frames = positive(&arg, args.next())?;
                options.frames = u32::try_from(frames).map_err(|_| "--frames is out of range")?;
            }
            "--scroll" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value after --scroll".to_owned())?;
                options.scroll = value
                    .parse()
                    .map_err(|_| format!("--scroll expects pixels, got `{value}`"))?;
            }
            "--no-smooth" => options.smooth = false,
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option `{flag}`"));
            }
            _ => {
                if target.replace(arg).is_some() {
                    return Err("only one URL or path may be given".to_owned());
                }
            }
        }
    }
    if let Some(target) = target {
        options.url = normalize_target(&target)?;
    }
    Ok(options)
}

fn positive(flag: &str, value: Option<String>) -> Result<i32, String> {
    let value = value.ok_or_else(|| format!("missing value after {flag}"))?;
    match value.parse::<i32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(format!("{flag} expects a positive number, got `{value}`")),
    }
}

/// URLs pass through; anything else is treated as a local path.
fn normalize_target(target: &str) -> Result<String, String> {
    if target.contains("://") || target.starts_with("about:") {
        return Ok(target.to_owned());
    }
    let path = std::path::absolute(target)
        .map_err(|error| format!("cannot resolve path `{target}`: {error}"))?;
    Url::from_file_path(&path)
        .map(|url| url.to_string())
        .map_err(|()| format!("`{}` is not a valid file path", path.display()))
}
