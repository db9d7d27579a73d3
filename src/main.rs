use gen_timeline::{build_with, load_score, Navigator, Pointed};
use std::env;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: gen-timeline <score.yaml> [--voice N] [--yaml]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    let input_path = &args[1];
    let mut voice: Option<u8> = None;
    let mut as_yaml = false;

    // Parse flags
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--voice" => match rest.next().and_then(|v| v.parse::<u8>().ok()) {
                Some(v) => voice = Some(v),
                None => {
                    eprintln!("--voice expects a voice number");
                    process::exit(1);
                }
            },
            "--yaml" => as_yaml = true,
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
    }

    // Read input file
    let source = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let loaded = match load_score(&source) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut context = loaded.context.clone();
    if voice.is_some() {
        context.initial_voice = voice;
    }

    let timeline = match build_with(&loaded.tree, &context) {
        Ok(timeline) => timeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Walk every position once
    let mut nav = Navigator::new(&timeline);
    let mut states = Vec::new();
    let mut timing = Vec::new();
    loop {
        states.push(nav.get_state());
        timing.push(nav.get_time_info());
        if nav.is_at_end_of_score() {
            break;
        }
        nav.move_next();
    }

    if as_yaml {
        match serde_yaml::to_string(&states) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    for (state, info) in states.iter().zip(&timing) {
        let what = match state.pointed {
            Pointed::Real(id) => match timeline.find_by_id(id) {
                Some(entry) => format!("{:?} {} (voice {})", entry.kind, id, entry.voice),
                None => format!("{}", id),
            },
            Pointed::EmptyPlace => match state.ref_id {
                Some(anchor) => format!("empty place before {}", anchor),
                None => "empty place".to_string(),
            },
            Pointed::EndOfStaff => "end of staff".to_string(),
            Pointed::EndOfScore => "end of score".to_string(),
        };
        println!(
            "{}.{} m{:<3} t{:<8} beat {:<5.2} {}",
            state.instrument,
            state.staff,
            state.measure + 1,
            state.time,
            info.beats_from_measure_start() + 1.0,
            what
        );
    }
}
