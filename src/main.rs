use std::env;
use std::fs;
use std::process;

use cadenza::RenderPolicy;

fn main() {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cadenza <track.yaml> [output.yaml]");
        eprintln!("       cadenza --lenient <track.yaml> [output.yaml]");
        process::exit(1);
    }

    let mut policy = RenderPolicy::Strict;
    let mut input_path = &args[1];
    let mut output_path: Option<&String> = args.get(2);

    // Parse flags
    if args[1] == "--lenient" {
        policy = RenderPolicy::SkipInvalidNotes;
        if args.len() < 3 {
            eprintln!("Usage: cadenza --lenient <track.yaml> [output.yaml]");
            process::exit(1);
        }
        input_path = &args[2];
        output_path = args.get(3);
    }

    // Read input file
    let source = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let performance = match cadenza::perform_source(&source, policy) {
        Ok(performance) => performance,
        Err(e) => {
            eprintln!("Render error: {}", e);
            process::exit(1);
        }
    };

    let yaml = match serde_yaml::to_string(&performance) {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("Error serializing performance: {}", e);
            process::exit(1);
        }
    };

    // Output
    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &yaml) {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!(
                "Wrote {} events ({:.0} ms) to {}",
                performance.events.len(),
                performance.duration_ms(),
                path
            );
        }
        None => {
            print!("{}", yaml);
        }
    }
}
