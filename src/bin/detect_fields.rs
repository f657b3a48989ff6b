//! CLI tool for inferring form fields from extracted element lists

use pdf_formfill::{detect_fields_batch, load_elements, FieldDetection, InferenceConfig};
use std::env;
use std::fs;
use std::process;
use std::time::Instant;

/// Name to print in usage text; argv may be empty
fn program_name(args: &[String]) -> &str {
    args.first().map_or("detect-fields", String::as_str)
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <elements.json>... [--config config.json] [--json]", program);
    eprintln!();
    eprintln!("Infers fillable fields from pre-extracted text elements.");
    eprintln!("Several element files are processed in parallel.");
    process::exit(1);
}

fn load_config(path: &str) -> Result<InferenceConfig, String> {
    let json = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    serde_json::from_str(&json).map_err(|e| format!("{}: {}", path, e))
}

fn print_detection(path: &str, detection: &FieldDetection) {
    println!("Form Field Detection");
    println!("====================");
    println!("File: {}", path);
    println!("Candidate lines: {}", detection.merged_fragments);
    println!("Fields: {}", detection.stats.total);
    for (field_type, count) in &detection.stats.by_type {
        println!("  {:<10} {}", field_type, count);
    }
    println!();

    for region in &detection.regions {
        println!(
            "#{:<4} p{} {:<10} ({:.1}, {:.1}) {:.1}x{:.1}  {}",
            region.id,
            region.page,
            region.field_type,
            region.x,
            region.y,
            region.width,
            region.height,
            region.name
        );
    }
    println!();
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);
    if args.len() < 2 {
        usage(program);
    }

    let mut json_output = false;
    let mut config_path = None;
    let mut inputs = Vec::new();
    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--json" => json_output = true,
            "--config" => match rest.next() {
                Some(path) => config_path = Some(path.clone()),
                None => usage(program),
            },
            _ => inputs.push(arg.clone()),
        }
    }
    if inputs.is_empty() {
        usage(program);
    }

    let config = match config_path {
        Some(path) => load_config(&path).unwrap_or_else(|e| {
            eprintln!("Error: invalid config {}", e);
            process::exit(1);
        }),
        None => InferenceConfig::default(),
    };

    let mut documents = Vec::with_capacity(inputs.len());
    for path in &inputs {
        match load_elements(path) {
            Ok(fragments) => documents.push(fragments),
            Err(e) => {
                if json_output {
                    println!("{}", serde_json::json!({ "file": path, "error": e.to_string() }));
                } else {
                    eprintln!("Error: {}: {}", path, e);
                }
                process::exit(1);
            }
        }
    }

    let start = Instant::now();
    let detections = detect_fields_batch(&documents, &config);
    let elapsed = start.elapsed();

    if json_output {
        let results: Vec<serde_json::Value> = inputs
            .iter()
            .zip(&detections)
            .map(|(path, detection)| {
                serde_json::json!({
                    "file": path,
                    "regions": detection.regions,
                    "stats": detection.stats,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({ "results": results, "detection_time_ms": elapsed.as_millis() as u64 })
        );
    } else {
        for (path, detection) in inputs.iter().zip(&detections) {
            print_detection(path, detection);
        }
        println!("Detection time: {}ms", elapsed.as_millis());
    }
}
