use signsight::source::native::{list_devices, NativeGate};
use signsight::{
    CaptureMode, HttpInferenceClient, SessionState, Translator, TranslatorConfig,
};
use std::env;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    signsight::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: signsight-cli <command> [args]");
        eprintln!("Commands: list-devices, analyze <file>, watch");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "list-devices" => cmd_list_devices(&args),
        "analyze" => cmd_analyze(&args),
        "watch" => cmd_watch(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_list_devices(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let devices = list_devices()?;
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for (id, name) in devices {
            println!("{}: {}", id, name);
        }
    }
    Ok(())
}

fn cmd_analyze(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 3 {
        eprintln!("Usage: signsight-cli analyze <file> [--words] [--json]");
        std::process::exit(1);
    }
    let path = &args[2];
    let mode = parse_mode(args);
    let config = TranslatorConfig::load_or_default();
    let client = HttpInferenceClient::new(config.endpoints.clone());
    let session = Translator::new(mode, config, NativeGate::default(), client);

    if !session.select_file(path) {
        eprintln!("Not a recognizable image file: {}", path);
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        session.analyze_uploaded().await;
    });

    report(&session, args.contains(&"--json".to_string()))?;
    if session.state() == SessionState::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_watch(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mode = parse_mode(args);
    let device_index = parse_device(args)?;
    let json = args.contains(&"--json".to_string());
    let config = TranslatorConfig::load_or_default();
    let interval = config.capture.default_interval_secs;
    let client = HttpInferenceClient::new(config.endpoints.clone());
    let session = Translator::new(mode, config, NativeGate::new(device_index), client);

    let runtime = tokio::runtime::Runtime::new()?;
    let failure = runtime.block_on(async {
        session.start_camera().await;
        if session.state() == SessionState::Error {
            return session.diagnostic();
        }
        eprintln!("Watching (interval {}s). Press Ctrl+C to stop.", interval);
        let mut last = None;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(Duration::from_millis(250)) => {
                    if session.state() == SessionState::Error {
                        break;
                    }
                    let current = session.result();
                    if current != last {
                        if let Some(ref result) = current {
                            if !result.is_empty() {
                                if json {
                                    println!("{}", serde_json::to_string(result).unwrap_or_default());
                                } else {
                                    println!("{} ({}%)", result.label, result.confidence_percent());
                                }
                            }
                        }
                        last = current;
                    }
                }
            }
        }
        // Stop clears the diagnostic, so capture it first.
        let failure = session.diagnostic();
        session.stop_camera();
        failure
    });

    if let Some(diagnostic) = failure {
        eprintln!("Error: {}", diagnostic);
        std::process::exit(1);
    }
    Ok(())
}

fn report(
    session: &Translator<NativeGate, HttpInferenceClient>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(diagnostic) = session.diagnostic() {
        eprintln!("Error: {}", diagnostic);
        return Ok(());
    }
    match session.result() {
        Some(result) if !result.is_empty() => {
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("{} ({}%)", result.label, result.confidence_percent());
            }
        }
        _ => {
            if json {
                println!("null");
            } else {
                println!("No sign recognized");
            }
        }
    }
    Ok(())
}

fn parse_mode(args: &[String]) -> CaptureMode {
    if args.contains(&"--words".to_string()) {
        CaptureMode::Words
    } else {
        CaptureMode::Letters
    }
}

fn parse_device(args: &[String]) -> Result<u32, Box<dyn std::error::Error>> {
    let mut i = 2;
    while i < args.len() {
        if args[i] == "--device" {
            i += 1;
            let value = args
                .get(i)
                .ok_or("--device requires an index")?;
            return Ok(value.parse()?);
        }
        i += 1;
    }
    Ok(0)
}
