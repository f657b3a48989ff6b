//! CLI tool for adding interactive form fields to a PDF

use pdf_formfill::{
    extract_fragments, fill_form, load_elements, FileSource, FillOptions, InferenceConfig,
};
use std::env;
use std::fs;
use std::process;

/// Name to print in usage text; argv may be empty
fn program_name(args: &[String]) -> &str {
    args.first().map_or("fill-form", String::as_str)
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} <input.pdf> <output.pdf> [elements.json] [--config config.json]",
        program
    );
    eprintln!();
    eprintln!("Detects blanks, checkboxes and radio buttons and overlays form widgets.");
    eprintln!("Without an element list, text is extracted from the PDF itself.");
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);

    let mut positional = Vec::new();
    let mut config_path = None;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if arg == "--config" {
            match rest.next() {
                Some(path) => config_path = Some(path.clone()),
                None => usage(program),
            }
        } else {
            positional.push(arg.clone());
        }
    }
    if positional.len() < 2 {
        usage(program);
    }

    let pdf_path = &positional[0];
    let output_path = &positional[1];

    let mut options = FillOptions::default();
    if let Some(path) = config_path {
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                serde_json::from_str::<InferenceConfig>(&json).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(config) => options.inference = config,
            Err(e) => {
                eprintln!("Error: invalid config {}: {}", path, e);
                process::exit(1);
            }
        }
    }

    let fragments = match positional.get(2) {
        Some(elements_path) => load_elements(elements_path),
        None => extract_fragments(pdf_path),
    };
    let fragments = match fragments {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    };

    match fill_form(&FileSource::new(pdf_path), &fragments, &options) {
        Ok(result) => {
            println!("PDF Form Fill");
            println!("=============");
            println!("File: {}", pdf_path);
            println!("Fragments: {}", fragments.len());
            println!("Processing time: {}ms", result.processing_time_ms);
            println!();
            for (field_type, count) in &result.detection.stats.by_type {
                println!("  {:<10} {}", field_type, count);
            }
            println!();
            println!("{}", result.message);

            if let Some(report) = &result.report {
                for error in &report.errors {
                    eprintln!("  field {} ({}): {}", error.region_id, error.name, error.message);
                }
                if let Err(e) = fs::write(output_path, &report.pdf) {
                    eprintln!("Error: failed to write {}: {}", output_path, e);
                    process::exit(1);
                }
                println!("Output written to: {}", output_path);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_name_without_argv() {
        assert_eq!(program_name(&[]), "fill-form");
    }

    #[test]
    fn test_program_name_from_argv() {
        let args = vec!["/usr/bin/fill-form".to_string()];
        assert_eq!(program_name(&args), "/usr/bin/fill-form");
    }
}
